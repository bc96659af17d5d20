//! Sitesmith HTTP API
//!
//! 启动: cargo run --bin sitesmith-web --features web
//! POST http://127.0.0.1:3000/api/agent  {"messages":[{"role":"user","parts":[{"text":"..."}]}]}

#![cfg(feature = "web")]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use sitesmith::agent::{
    create_agent_components, create_llm_from_config, process_messages, AgentComponents,
};
use sitesmith::config::{load_config, AppConfig};
use sitesmith::memory::Message;
use sitesmith::observability;

const INVALID_MESSAGES: &str = "Invalid messages format";
const INTERNAL_ERROR: &str = "Internal server error";

struct AppState {
    components: Arc<AgentComponents>,
}

#[derive(Debug, Serialize)]
struct AgentResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<Vec<Message>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AgentResponse {
    fn ok(messages: Vec<Message>, url: Option<String>) -> Self {
        Self {
            success: true,
            messages: Some(messages),
            url,
            error: None,
        }
    }

    fn err(error: &str) -> Self {
        Self {
            success: false,
            messages: None,
            url: None,
            error: Some(error.to_string()),
        }
    }
}

/// 请求体必须含非空 messages 数组，且每个元素都能解析为 Message
fn parse_messages(body: &Value) -> Option<Vec<Message>> {
    let items = body.get("messages")?.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| serde_json::from_value::<Message>(v.clone()).ok())
        .collect()
}

async fn api_agent(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<AgentResponse>) {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected agent request body");
            Value::Null
        }
    };
    let Some(messages) = parse_messages(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(AgentResponse::err(INVALID_MESSAGES)),
        );
    };

    let request_id = uuid::Uuid::new_v4();
    tracing::info!(%request_id, messages = messages.len(), "agent request");

    let components = state.components.clone();
    let task = tokio::spawn(async move { process_messages(&components, messages).await });

    match task.await {
        Ok(conversation) => {
            let url = conversation.preview_link();
            tracing::info!(%request_id, url = ?url, "agent request done");
            (
                StatusCode::OK,
                Json(AgentResponse::ok(conversation.into_messages(), url)),
            )
        }
        Err(e) => {
            tracing::error!(%request_id, error = %e, "agent task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AgentResponse::err(INTERNAL_ERROR)),
            )
        }
    }
}

async fn api_health() -> &'static str {
    "OK"
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/agent", post(api_agent))
        .route("/api/health", get(api_health))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let llm = create_llm_from_config(&cfg);
    let components = create_agent_components(&cfg, llm).context("Failed to create agent")?;
    let state = Arc::new(AppState {
        components: Arc::new(components),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.web.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Sitesmith API listening on http://{}", addr);
    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
