//! HTTP API handlers.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET | `/api/templates` | | `{"templates": [...]}` |
//! | POST | `/api/templates/:name/render` | value map | envelope |
//! | POST | `/api/envelope/dry-run` | envelope | `{"commands": n, "lines": [...]}` |
//! | POST | `/api/envelope/print` | envelope | `{"success": true, "commands": n}` |
//!
//! Errors come back as plain text with a 4xx status for bad input and 5xx
//! for device or server failures.

use std::sync::{Arc, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::state::AppState;
use crate::driver::{FingerprintDriver, create_driver};
use crate::error::EtiketError;
use crate::interpreter::Interpreter;
use crate::values::{ValueMap, derive_display_fields};

type ApiResult = Result<Json<Value>, (StatusCode, String)>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/templates", get(list_templates))
        .route("/api/templates/:name/render", post(render_template))
        .route("/api/envelope/dry-run", post(dry_run))
        .route("/api/envelope/print", post(print))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle GET /api/templates
async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "templates": state.registry.list_templates() }))
}

/// Handle POST /api/templates/:name/render - value map → envelope
async fn render_template(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(values): Json<ValueMap>,
) -> ApiResult {
    let values = derive_display_fields(&values, &state.config.defaults);
    let envelope = state
        .registry
        .render_template(&name, &values)
        .map_err(error_response)?;
    let value = envelope.to_value().map_err(error_response)?;
    Ok(Json(value))
}

/// Handle POST /api/envelope/dry-run - envelope → Fingerprint lines
async fn dry_run(Json(envelope): Json<Value>) -> ApiResult {
    let (commands, lines) = tokio::task::spawn_blocking(move || {
        let mut driver = FingerprintDriver::dry_run();
        let commands = Interpreter::new(&mut driver).run(envelope)?;
        Ok::<_, EtiketError>((commands, driver.sent().to_vec()))
    })
    .await
    .map_err(task_error)?
    .map_err(error_response)?;

    Ok(Json(json!({ "commands": commands, "lines": lines })))
}

/// Handle POST /api/envelope/print - envelope → configured driver
async fn print(State(state): State<Arc<AppState>>, Json(envelope): Json<Value>) -> ApiResult {
    let commands = tokio::task::spawn_blocking(move || {
        let config = &state.config;
        let _guard = state.print_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut driver = create_driver(config.driver, &config.printer, config.dry_run);
        Interpreter::new(driver.as_mut()).run(envelope)
    })
    .await
    .map_err(task_error)?
    .map_err(error_response)?;

    Ok(Json(json!({ "success": true, "commands": commands })))
}

fn error_response(err: EtiketError) -> (StatusCode, String) {
    let status = match &err {
        EtiketError::Payload(_)
        | EtiketError::SchemaViolation { .. }
        | EtiketError::MalformedEnvelope(_)
        | EtiketError::UnsupportedCommand(_)
        | EtiketError::NumericCoercion { .. }
        | EtiketError::Json(_) => StatusCode::BAD_REQUEST,
        EtiketError::UnknownTemplate { .. } => StatusCode::NOT_FOUND,
        EtiketError::NotConnected | EtiketError::Transport(_) => StatusCode::BAD_GATEWAY,
        EtiketError::Template(_) | EtiketError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }
    (status, err.to_string())
}

fn task_error(err: tokio::task::JoinError) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Task error: {}", err),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState::new(ServerConfig {
            dry_run: true,
            ..ServerConfig::default()
        })))
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_templates() {
        let (status, body) = call("GET", "/api/templates", None).await;
        assert_eq!(status, StatusCode::OK);
        let names = json_body(&body)["templates"].clone();
        assert!(names.as_array().unwrap().contains(&json!("scleral_v4")));
        assert!(names.as_array().unwrap().contains(&json!("demo")));
    }

    #[tokio::test]
    async fn test_render_demo_template() {
        let (status, body) = call(
            "POST",
            "/api/templates/demo/render",
            Some(json!({ "NAME": "World", "BONNR": "1008018" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let envelope = json_body(&body);
        let commands = envelope["commands"].as_array().unwrap();
        assert_eq!(commands[0]["name"], "Setup");
        assert_eq!(commands.last().unwrap()["name"], "PrintFeed");
        assert!(commands.iter().any(|c| c["args"]["text"] == "Hello World"));
        assert!(commands.iter().any(|c| c["args"]["text"] == "Order 1008018"));
    }

    #[tokio::test]
    async fn test_render_unknown_template_is_404() {
        let (status, body) = call("POST", "/api/templates/nope/render", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(body).unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_dry_run_returns_lines() {
        let envelope = json!({
            "version": "1.0",
            "width": 80, "height": 60, "units": "mm",
            "commands": [
                { "name": "Setup", "args": { "name": "T" } },
                { "name": "MoveTo", "args": { "x": 10, "y": 50 } },
                { "name": "DrawText", "args": { "text": "hi" } },
                { "name": "PrintFeed", "args": {} }
            ]
        });
        let (status, body) = call("POST", "/api/envelope/dry-run", Some(envelope)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({
                "commands": 4,
                "lines": ["SETUP \"T\"", "PRPOS 80,400", "PRTXT \"hi\"", "PRINTFEED"]
            })
        );
    }

    #[tokio::test]
    async fn test_dry_run_rejects_unknown_command() {
        let envelope = json!({ "commands": [{ "name": "Foo", "args": {} }] });
        let (status, body) = call("POST", "/api/envelope/dry-run", Some(envelope)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("Foo"));
    }

    #[tokio::test]
    async fn test_print_with_dry_run_config() {
        let envelope = json!({ "commands": [{ "name": "PrintFeed", "args": {} }] });
        let (status, body) = call("POST", "/api/envelope/print", Some(envelope)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({ "success": true, "commands": 1 }));
    }
}
