//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::interpreter::CommandInterpreter;
use crate::metrics::Metrics;
use crate::store::{ClientStore, SharedQueue};

use super::auth;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub metrics: Arc<Metrics>,
    pub interpreter: Arc<CommandInterpreter>,
    pub queue: SharedQueue,
}

impl AppState {
    fn client_or_default(&self, client_id: Option<String>) -> String {
        client_id
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.config.default_client.clone())
    }
}

/// Build the application router. Split out from `serve` so tests can drive
/// it with `tower::ServiceExt`.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/ping", get(ping));

    let protected_routes = Router::new()
        .route("/command", post(submit_command))
        .route("/insights", get(get_insights))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(landing)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn landing() -> Html<&'static str> {
    Html(
        "<html><body><h1>opsdesk</h1>\
<p>POST /command with {\"message\": ...} to hand work to the crew.</p>\
</body></html>",
    )
}

/// Interpret a free-text command and queue the resulting task.
async fn submit_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty".to_string(),
            }),
        ));
    }

    let client_id = state.client_or_default(req.client_id);
    let decision = state.interpreter.interpret(&req.message, &client_id).await;
    state
        .queue
        .enqueue(&decision.agent, decision.task.clone(), &client_id);

    Ok(Json(CommandResponse {
        client_id,
        agent: decision.agent,
        task: decision.task,
    }))
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    client_id: Option<String>,
}

/// Process metrics plus the tail of the client's conversation memory.
async fn get_insights(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InsightsQuery>,
) -> Json<InsightsResponse> {
    let client_id = state.client_or_default(query.client_id);
    let store = ClientStore::new(&state.config.data_dir, &client_id);
    let mut recent_memory = store.load_memory();
    if recent_memory.len() > 5 {
        recent_memory.drain(..recent_memory.len() - 5);
    }

    Json(InsightsResponse {
        client_id,
        metrics: state.metrics.snapshot(),
        recent_memory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::OfflineLlm;
    use crate::config::MailConfig;
    use crate::store::QueueStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir, api_token: Option<&str>) -> Arc<AppState> {
        let queue: SharedQueue = Arc::new(QueueStore::new(dir.path()));
        let interpreter = Arc::new(CommandInterpreter::new(
            Arc::new(OfflineLlm),
            dir.path(),
            Arc::clone(&queue),
        ));
        Arc::new(AppState {
            config: Config {
                api_key: String::new(),
                model: "gpt-4o".to_string(),
                data_dir: dir.path().to_path_buf(),
                host: "127.0.0.1".to_string(),
                port: 0,
                api_token: api_token.map(String::from),
                sandbox_mode: true,
                loop_interval_secs: 0,
                default_client: "default".to_string(),
                mail: MailConfig::default(),
            },
            metrics: Arc::new(Metrics::new()),
            interpreter,
            queue,
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ping_is_public() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(&dir, Some("secret")));

        let response = app
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn command_requires_token_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(&dir, Some("secret")));

        let request = Request::post("/command")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"add lead a@b.com"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn command_queues_fallback_task_offline() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None);
        let app = router(Arc::clone(&state));

        let request = Request::post("/command")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"client_id":"acme","message":"do things"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["agent"], "Manager Agent");

        let doc = state.queue.dequeue_all("acme");
        assert_eq!(doc["Manager Agent"].len(), 1);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(&dir, None));

        let request = Request::post("/command")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"  "}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insights_reports_metrics_and_memory_tail() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None);
        let store = ClientStore::new(dir.path(), "acme");
        for i in 0..8 {
            store.append_memory(crate::store::Role::User, format!("message {}", i));
        }
        state.metrics.add_revenue("acme", 129);

        let app = router(Arc::clone(&state));
        let response = app
            .oneshot(
                Request::get("/insights?client_id=acme")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["metrics"]["revenue_generated"], 129);
        assert_eq!(json["recent_memory"].as_array().unwrap().len(), 5);
        assert_eq!(json["recent_memory"][4]["content"], "message 7");
    }
}
