//! Locating step files on disk.
//!
//! Step imports reference files by GUID only; the repository maps a GUID to
//! a concrete path inside a `databases/repository` folder. The folder is
//! probed relative to the working directory, then relative to the running
//! binary, then through the `STEPFOLDER` override.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment override for the repository root.
pub const STEP_FOLDER_ENV: &str = "STEPFOLDER";

const REPOSITORY_SUBDIR: &str = "databases/repository";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("No step repository found; set STEPFOLDER or create a databases/repository folder")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct StepRepository {
    root: PathBuf,
}

impl StepRepository {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Probe the standard locations for a repository folder.
    pub fn locate() -> Result<Self, RepositoryError> {
        let local = PathBuf::from(REPOSITORY_SUBDIR);
        if local.is_dir() {
            return Ok(Self::from_root(local));
        }
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                for ancestor in ["..", "../.."] {
                    let candidate = dir.join(ancestor).join(REPOSITORY_SUBDIR);
                    if candidate.is_dir() {
                        return Ok(Self::from_root(candidate));
                    }
                }
            }
        }
        if let Some(folder) = std::env::var_os(STEP_FOLDER_ENV) {
            let candidate = PathBuf::from(folder);
            if candidate.is_dir() {
                return Ok(Self::from_root(candidate));
            }
        }
        Err(RepositoryError::NotFound)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `guid`. The lower-case extension wins when
    /// both spellings exist.
    pub fn step_path(&self, guid: &str) -> PathBuf {
        let lower = self.root.join(format!("{}.stp", guid));
        if lower.exists() {
            return lower;
        }
        let upper = self.root.join(format!("{}.STEP", guid));
        if upper.exists() {
            upper
        } else {
            lower
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_case_extension_is_preferred() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(dir.path().join("part.stp"), "a").expect("Should write");
        std::fs::write(dir.path().join("part.STEP"), "b").expect("Should write");

        let repository = StepRepository::from_root(dir.path());
        assert_eq!(repository.step_path("part"), dir.path().join("part.stp"));
    }

    #[test]
    fn test_upper_case_extension_is_the_fallback() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(dir.path().join("part.STEP"), "b").expect("Should write");

        let repository = StepRepository::from_root(dir.path());
        assert_eq!(repository.step_path("part"), dir.path().join("part.STEP"));
    }

    #[test]
    fn test_missing_file_defaults_to_lower_case() {
        let dir = tempfile::tempdir().expect("Should create temp dir");

        let repository = StepRepository::from_root(dir.path());
        assert_eq!(repository.step_path("ghost"), dir.path().join("ghost.stp"));
    }
}
