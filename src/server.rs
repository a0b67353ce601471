use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::aggregate::Reply;
use crate::error::{ErrorKind, KeyschemaError};
use crate::interface::RequestInterface;
use crate::schema::Dimension;
use crate::store::Store;

#[derive(Deserialize)]
pub struct CommandRequest {
    /// Kept as raw text so the order of the document's keys survives.
    #[serde(default)]
    pub document: Option<Box<RawValue>>,
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub id: u64,
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SchemaResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<Dimension>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn status_of(error: &KeyschemaError) -> StatusCode {
    match error.kind() {
        ErrorKind::Structural | ErrorKind::Semantic => StatusCode::BAD_REQUEST,
        ErrorKind::Backend | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A document sent as a JSON string is unwrapped, anything else is used as is.
fn document_text(raw: &RawValue) -> String {
    serde_json::from_str::<String>(raw.get()).unwrap_or_else(|_| raw.get().to_owned())
}

/// The schema listing lives under a name no command can take, so every
/// `POST /v1/<command>` reaches the command handler.
pub fn router<S>(interface: Arc<RequestInterface<S>>) -> Router
where
    S: Store + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/v1/:command", post(command::<S>))
        .route("/v1/_schema", get(schema::<S>))
        .layer(cors)
        .with_state(interface)
}

async fn command<S>(
    State(interface): State<Arc<RequestInterface<S>>>,
    Path(command): Path<String>,
    Json(body): Json<CommandRequest>,
) -> (StatusCode, Json<CommandResponse>)
where
    S: Store + Send + 'static,
{
    let document = body.document.as_deref().map(document_text);
    let started = std::time::Instant::now();
    // the engine is synchronous
    let joined = tokio::task::spawn_blocking(move || interface.submit(&command, document)).await;
    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Join error");
            let body = CommandResponse {
                id: 0,
                status: "error".into(),
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                reply: None,
                error: Some("Join error".into()),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body));
        }
    };
    let elapsed_ms = outcome.elapsed_ms();
    match outcome.result {
        Ok(reply) => {
            info!(id = %outcome.id, ms = elapsed_ms, "command complete");
            let body = CommandResponse {
                id: outcome.id.value(),
                status: "ok".into(),
                elapsed_ms,
                reply: Some(reply),
                error: None,
            };
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            let status = status_of(&e);
            let msg = e.to_string();
            warn!(id = %outcome.id, %msg, code = %status.as_u16(), "command error");
            let body = CommandResponse {
                id: outcome.id.value(),
                status: "error".into(),
                elapsed_ms,
                reply: None,
                error: Some(msg),
            };
            (status, Json(body))
        }
    }
}

async fn schema<S>(State(interface): State<Arc<RequestInterface<S>>>) -> (StatusCode, Json<SchemaResponse>)
where
    S: Store + Send + 'static,
{
    let joined = tokio::task::spawn_blocking(move || interface.dimensions()).await;
    let result = match joined {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Join error");
            let body = SchemaResponse {
                status: "error".into(),
                dimensions: None,
                error: Some("Join error".into()),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body));
        }
    };
    match result {
        Ok(dimensions) => (
            StatusCode::OK,
            Json(SchemaResponse { status: "ok".into(), dimensions: Some(dimensions), error: None }),
        ),
        Err(e) => {
            let status = status_of(&e);
            warn!(error = %e, code = %status.as_u16(), "schema error");
            (status, Json(SchemaResponse { status: "error".into(), dimensions: None, error: Some(e.to_string()) }))
        }
    }
}
