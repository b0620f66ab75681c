use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use display_core::kernel::{default_kernel, MockKernel};
use display_core::pipeline::DisplayPipeline;
use display_core::response::{DisplayCache, DisplayResponse};
use display_core::runner::MockRunner;
use display_core::scene::SceneGraph;
use serde::{Deserialize, Serialize};

// Application State
struct AppState {
    pipeline: DisplayPipeline<MockKernel, MockRunner>,
    sessions: RwLock<HashMap<String, DisplayCache>>,
}

#[derive(Deserialize)]
struct DisplayRequest {
    /// Omitted on the first request; the reply hands one back.
    session: Option<String>,
    scene: SceneGraph,
}

#[derive(Serialize)]
struct DisplayReply {
    session: String,
    #[serde(flatten)]
    response: DisplayResponse,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let shared_state = Arc::new(AppState {
        pipeline: DisplayPipeline::new(default_kernel(), MockRunner),
        sessions: RwLock::new(HashMap::new()),
    });

    // build our application with a route
    let app = Router::new()
        .route("/", get(root))
        .route("/api/display", post(display))
        .route("/api/session/:id", delete(drop_session))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn root() -> &'static str {
    "Hello from Display Backend!"
}

async fn display(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DisplayRequest>,
) -> Result<Json<DisplayReply>, (StatusCode, String)> {
    let session = request
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Copy the cache out so the lock is not held across the await
    let previous = {
        let sessions = state.sessions.read().unwrap();
        sessions.get(&session).cloned().unwrap_or_default()
    };

    match state.pipeline.process(&request.scene, &previous).await {
        Ok(response) => {
            info!(
                "Computed {} solids for session {}",
                response.solids.len(),
                session
            );
            let mut sessions = state.sessions.write().unwrap();
            sessions.insert(session.clone(), response.display_cache.clone());
            Ok(Json(DisplayReply { session, response }))
        }
        Err(e) => {
            warn!("Display computation failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn drop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    let mut sessions = state.sessions.write().unwrap();
    if sessions.remove(&id).is_some() {
        info!("Dropped session {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
