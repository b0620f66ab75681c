//! Line interpreter for synthesized scripts.
//!
//! This runner understands exactly the statements the synthesizer emits:
//! parameter declarations, guarded assignments, and the three registration
//! calls. It mirrors the guard semantics of the generated try/catch blocks:
//! a failed assignment suppresses the block's registration call and is
//! reported when the block's `reportError` line is reached. Anything outside
//! that grammar is a fatal [`RunError`].

use std::collections::HashMap;

use crate::kernel::Kernel;
use crate::runner::{RunEnv, RunError, ScriptRunner};

#[derive(Debug, Clone, Copy, Default)]
pub struct MockRunner;

impl<K: Kernel> ScriptRunner<K> for MockRunner {
    fn run(&self, kernel: &K, source: &str, env: &mut RunEnv<K::Solid>) -> Result<(), RunError> {
        let mut interpreter = Interpreter {
            kernel,
            env,
            parameters: HashMap::new(),
            symbols: HashMap::new(),
            pending: None,
        };
        for (index, raw_line) in source.lines().enumerate() {
            interpreter.statement(index + 1, raw_line.trim())?;
        }
        Ok(())
    }
}

/// A failed assignment waiting for its block's `reportError` line.
struct PendingError {
    symbol: String,
    message: String,
}

struct Interpreter<'a, K: Kernel> {
    kernel: &'a K,
    env: &'a mut RunEnv<K::Solid>,
    parameters: HashMap<String, String>,
    symbols: HashMap<String, K::Solid>,
    pending: Option<PendingError>,
}

impl<'a, K: Kernel> Interpreter<'a, K> {
    fn statement(&mut self, line: usize, text: &str) -> Result<(), RunError> {
        if text.is_empty()
            || text == "try {"
            || text == "}"
            || text == "} catch(err) {"
            || text.starts_with("console.log(")
        {
            return Ok(());
        }
        if let Some(rest) = text.strip_prefix("var $") {
            return self.declare_parameter(line, rest);
        }
        if text.starts_with("var ") {
            return Ok(());
        }
        if let Some(arguments) = call_arguments(text, "displayFillet") {
            return self.display_fillet(line, arguments);
        }
        if let Some(arguments) = call_arguments(text, "display") {
            return self.display(line, arguments);
        }
        if let Some(arguments) = call_arguments(text, "reportError") {
            return self.report_error(line, arguments);
        }
        if let Some((symbol, expression)) = text
            .strip_suffix(';')
            .and_then(|stripped| stripped.split_once(" = "))
        {
            self.assign(symbol, expression);
            return Ok(());
        }
        Err(script_error(line, format!("unrecognized statement: {}", text)))
    }

    fn declare_parameter(&mut self, line: usize, rest: &str) -> Result<(), RunError> {
        let (id, value) = rest
            .strip_suffix(';')
            .and_then(|stripped| stripped.split_once(" = "))
            .ok_or_else(|| script_error(line, format!("malformed parameter declaration: {}", rest)))?;
        self.parameters.insert(id.to_string(), value.to_string());
        Ok(())
    }

    fn assign(&mut self, symbol: &str, expression: &str) {
        match self.substitute(expression) {
            Ok(expression) => match self.kernel.solid_from_expression(&expression) {
                Ok(solid) => {
                    self.symbols.insert(symbol.to_string(), solid);
                    self.pending = None;
                }
                Err(err) => {
                    self.pending = Some(PendingError {
                        symbol: symbol.to_string(),
                        message: err.to_string(),
                    });
                }
            },
            Err(message) => {
                self.pending = Some(PendingError {
                    symbol: symbol.to_string(),
                    message,
                });
            }
        }
    }

    fn display(&mut self, line: usize, arguments: Vec<&str>) -> Result<(), RunError> {
        let [symbol, id] = arguments[..] else {
            return Err(script_error(line, "display takes a symbol and an id"));
        };
        let id = unquote(id).ok_or_else(|| script_error(line, "registration id must be quoted"))?;
        if self.block_failed(symbol) {
            return Ok(());
        }
        match self.symbols.get(symbol) {
            Some(solid) => {
                self.env.display(solid.clone(), id);
                Ok(())
            }
            None => Err(script_error(line, format!("{} is not defined", symbol))),
        }
    }

    fn display_fillet(&mut self, line: usize, arguments: Vec<&str>) -> Result<(), RunError> {
        let [symbol, id, factor] = arguments[..] else {
            return Err(script_error(line, "displayFillet takes a symbol, an id and a factor"));
        };
        let id = unquote(id).ok_or_else(|| script_error(line, "registration id must be quoted"))?;
        let factor: f64 = factor
            .parse()
            .map_err(|_| script_error(line, format!("malformed fillet factor: {}", factor)))?;
        if self.block_failed(symbol) {
            return Ok(());
        }
        match self.symbols.get(symbol).cloned() {
            Some(solid) => {
                if let Err(err) = self.env.display_fillet(self.kernel, solid, id, factor) {
                    self.pending = Some(PendingError {
                        symbol: symbol.to_string(),
                        message: err.to_string(),
                    });
                }
                Ok(())
            }
            None => Err(script_error(line, format!("{} is not defined", symbol))),
        }
    }

    fn report_error(&mut self, _line: usize, arguments: Vec<&str>) -> Result<(), RunError> {
        // the catch arm only executes when its block actually failed
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let [_err, id] = arguments[..] else {
            return Ok(());
        };
        if let Some(id) = unquote(id) {
            self.env.log(format!(
                "building {} with id {} has failed",
                pending.symbol, id
            ));
            self.env.log(format!(" err = {}", pending.message));
            self.env.report_error(id, &pending.message);
        }
        Ok(())
    }

    fn block_failed(&self, symbol: &str) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |pending| pending.symbol == symbol)
    }

    fn substitute(&self, expression: &str) -> Result<String, String> {
        let mut out = String::with_capacity(expression.len());
        let mut rest = expression;
        while let Some(position) = rest.find('$') {
            out.push_str(&rest[..position]);
            let after = &rest[position + 1..];
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let id = &after[..end];
            if id.is_empty() {
                out.push('$');
                rest = after;
                continue;
            }
            match self.parameters.get(id) {
                Some(value) => out.push_str(value),
                None => return Err(format!("${} is not defined", id)),
            }
            rest = &after[end..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn script_error(line: usize, message: impl Into<String>) -> RunError {
    RunError::Script {
        line,
        message: message.into(),
    }
}

fn call_arguments<'t>(text: &'t str, name: &str) -> Option<Vec<&'t str>> {
    let inner = text
        .strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(");")?;
    Some(inner.split(',').map(str::trim).collect())
}

fn unquote(text: &str) -> Option<&str> {
    text.strip_prefix('"')?.strip_suffix('"')
}
