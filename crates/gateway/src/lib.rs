//! HTTP API gateway for helpdesk.
//!
//! Thin plumbing around the orchestration engine: request validation,
//! SSE streaming, and conversation CRUD. Built on Axum.
//!
//! Endpoints:
//! - `POST   /api/chat/messages`           — send a message, stream the reply
//! - `GET    /api/chat/conversations`      — list a user's conversations
//! - `GET    /api/chat/conversations/{id}` — fetch one conversation
//! - `DELETE /api/chat/conversations/{id}` — delete a conversation
//! - `GET    /api/agents`                  — agent metadata
//! - `GET    /health`                      — liveness

pub mod api;

use axum::{
    Router,
    response::Json,
    routing::{delete, get, post},
};
use helpdesk_agent::Orchestrator;
use helpdesk_core::store::ConversationStore;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub conversations: Arc<dyn ConversationStore>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat/messages", post(api::send_message_handler))
        .route("/api/chat/conversations", get(api::list_conversations_handler))
        .route(
            "/api/chat/conversations/{id}",
            get(api::get_conversation_handler),
        )
        .route(
            "/api/chat/conversations/{id}",
            delete(api::delete_conversation_handler),
        )
        .route("/api/agents", get(api::list_agents_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn serve(
    state: SharedState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
