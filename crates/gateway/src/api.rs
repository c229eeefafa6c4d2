//! Request handlers — validation, response formatting, streaming.

use crate::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::HeaderName},
    response::sse::{Event as SseEvent, Sse},
    response::Json,
};
use helpdesk_agent::runner::AgentStreamHandle;
use helpdesk_agent::{AgentStreamEvent, registry};
use helpdesk_core::error::Error;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

// ── Error envelope ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiError {
    error: ApiErrorBody,
}

#[derive(Serialize)]
struct ApiErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                code,
                message: message.into(),
            },
        }
    }
}

type ErrorResponse = (StatusCode, Json<ApiError>);

fn map_error(err: Error) -> ErrorResponse {
    match err {
        Error::ConversationNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                "NOT_FOUND",
                format!("Conversation {id} not found"),
            )),
        ),
        Error::QuotaExceeded { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiError::new(
                "QUOTA_EXCEEDED",
                format!("Provider quota exceeded, retry after {retry_after_secs}s"),
            )),
        ),
        other => {
            error!(error = %other, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("INTERNAL_ERROR", other.to_string())),
            )
        }
    }
}

fn storage_error(err: helpdesk_core::error::StorageError) -> ErrorResponse {
    map_error(Error::Storage(err))
}

// ── Chat ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    conversation_id: Option<String>,
    message: String,
    user_id: String,
}

/// `POST /api/chat/messages` — send a message and stream the agent's
/// reply as SSE. Routing metadata rides along as response headers.
pub async fn send_message_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<
    (
        HeaderMap,
        Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    ),
    ErrorResponse,
> {
    if payload.message.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new("VALIDATION_ERROR", "Message content is required")),
        ));
    }
    if payload.user_id.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new("VALIDATION_ERROR", "User ID is required")),
        ));
    }

    let processed = state
        .orchestrator
        .process_message(
            &payload.user_id,
            &payload.message,
            payload.conversation_id.as_deref(),
        )
        .await
        .map_err(map_error)?;

    let conversation_id = processed.conversation_id.clone();
    let agent = processed.agent;
    let AgentStreamHandle { events, full_text } = processed.stream;

    // Fire-and-forget persistence: the response below streams regardless
    // of what happens here. If the exchange died mid-stream the oneshot
    // is closed and there is nothing to persist.
    let orchestrator = state.orchestrator.clone();
    let persist_conversation_id = conversation_id.clone();
    tokio::spawn(async move {
        match full_text.await {
            Ok(text) => {
                if let Err(e) = orchestrator
                    .persist_assistant_response(&persist_conversation_id, agent, &text)
                    .await
                {
                    error!(
                        conversation_id = %persist_conversation_id,
                        error = %e,
                        "Failed to persist assistant response"
                    );
                }
            }
            Err(_) => {
                warn!(
                    conversation_id = %persist_conversation_id,
                    "Exchange ended without final text, skipping persistence"
                );
            }
        }
    });

    info!(
        conversation_id = %conversation_id,
        agent = %agent,
        intent = %processed.intent.intent,
        "Streaming agent response"
    );

    let mut headers = HeaderMap::new();
    insert_header(&mut headers, "x-conversation-id", &conversation_id);
    insert_header(&mut headers, "x-agent-type", agent.as_str());
    insert_header(&mut headers, "x-intent", processed.intent.intent.as_str());
    insert_header(
        &mut headers,
        "x-intent-confidence",
        &processed.intent.confidence.to_string(),
    );

    let stream = ReceiverStream::new(events).map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok((headers, Sse::new(stream)))
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

// ── Conversations ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListConversationsQuery {
    user_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Serialize)]
pub struct ListConversationsResponse {
    data: Vec<helpdesk_core::store::ConversationSummary>,
    pagination: Pagination,
}

#[derive(Serialize)]
struct Pagination {
    total: usize,
    limit: usize,
    offset: usize,
}

pub async fn list_conversations_handler(
    State(state): State<SharedState>,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<ListConversationsResponse>, ErrorResponse> {
    let Some(user_id) = query.user_id.filter(|u| !u.trim().is_empty()) else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new(
                "VALIDATION_ERROR",
                "user_id query parameter is required",
            )),
        ));
    };

    let limit = query.limit.min(100);
    let page = state
        .conversations
        .list_conversations(&user_id, limit, query.offset)
        .await
        .map_err(storage_error)?;

    Ok(Json(ListConversationsResponse {
        data: page.items,
        pagination: Pagination {
            total: page.total,
            limit,
            offset: query.offset,
        },
    }))
}

#[derive(Serialize)]
pub struct DataResponse<T> {
    data: T,
}

pub async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<helpdesk_core::message::Conversation>>, ErrorResponse> {
    let conversation = state
        .conversations
        .get_conversation(&id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| map_error(Error::ConversationNotFound(id)))?;

    Ok(Json(DataResponse { data: conversation }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    id: String,
    deleted: bool,
}

pub async fn delete_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<DeleteResponse>>, ErrorResponse> {
    let deleted = state
        .conversations
        .delete_conversation(&id)
        .await
        .map_err(storage_error)?;

    if !deleted {
        return Err(map_error(Error::ConversationNotFound(id)));
    }

    Ok(Json(DataResponse {
        data: DeleteResponse { id, deleted: true },
    }))
}

// ── Agents ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AgentDto {
    #[serde(rename = "type")]
    agent_type: &'static str,
    name: &'static str,
    description: &'static str,
    capabilities: &'static [&'static str],
    tools: &'static [&'static str],
}

pub async fn list_agents_handler() -> Json<DataResponse<Vec<AgentDto>>> {
    let agents = registry::all_descriptors()
        .iter()
        .map(|d| AgentDto {
            agent_type: d.agent.as_str(),
            name: d.name,
            description: d.description,
            capabilities: d.capabilities,
            tools: d.tool_names,
        })
        .collect();

    Json(DataResponse { data: agents })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use helpdesk_agent::Orchestrator;
    use helpdesk_agent::testing::ScriptedModel;
    use helpdesk_core::event::EventBus;
    use helpdesk_store::{SqliteStore, seed};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state(model: ScriptedModel) -> SharedState {
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        seed::run(&store).await.unwrap();
        let config = helpdesk_config::AppConfig::default();
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            store.clone(),
            Arc::new(model),
            &config,
            Arc::new(EventBus::default()),
        ));
        Arc::new(GatewayState {
            orchestrator,
            conversations: store,
        })
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(ScriptedModel::new()).await);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_conversation_is_404() {
        let app = build_router(test_state(ScriptedModel::new()).await);

        let req = Request::builder()
            .uri("/api/chat/conversations/no-such-id")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let app = build_router(test_state(ScriptedModel::new()).await);

        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/messages")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"conversation_id":null,"message":"   ","user_id":"user-001"}"#,
            ))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn agents_listing_covers_the_taxonomy() {
        let app = build_router(test_state(ScriptedModel::new()).await);

        let req = Request::builder()
            .uri("/api/agents")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let agents = parsed["data"].as_array().unwrap();
        assert_eq!(agents.len(), 4);
        assert!(agents.iter().any(|a| a["type"] == "billing"));
    }

    #[tokio::test]
    async fn send_message_streams_and_persists() {
        let model = ScriptedModel::new()
            .push_text("Greeting")
            .push_object(serde_json::json!({
                "intent": "general",
                "confidence": 0.9,
                "reasoning": "Just a greeting"
            }))
            .push_step_text("Hello there!");
        let state = test_state(model).await;
        let app = build_router(state.clone());

        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/messages")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"conversation_id":null,"message":"hi","user_id":"user-001"}"#,
            ))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let conversation_id = response
            .headers()
            .get("x-conversation-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(response.headers().get("x-agent-type").unwrap(), "support");
        assert_eq!(response.headers().get("x-intent").unwrap(), "general");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("event: chunk"));
        assert!(body.contains("event: done"));
        assert!(body.contains("Hello there!"));

        // The detached persistence task appends the assistant message.
        let mut persisted = Vec::new();
        for _ in 0..100 {
            persisted = state
                .conversations
                .list_messages(&conversation_id)
                .await
                .unwrap();
            if persisted.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(persisted.len(), 2, "assistant message was not persisted");
        assert_eq!(persisted[1].content, "Hello there!");
        assert_eq!(
            persisted[1].agent_type,
            Some(helpdesk_core::agent::AgentType::Support)
        );
    }

    #[tokio::test]
    async fn delete_conversation_round_trip() {
        let state = test_state(ScriptedModel::new()).await;
        let conv = state
            .conversations
            .create_conversation("user-001", Some("To delete"))
            .await
            .unwrap();
        let app = build_router(state);

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/chat/conversations/{}", conv.id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // A second delete is a 404.
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/chat/conversations/{}", conv.id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_conversations_requires_user_id() {
        let app = build_router(test_state(ScriptedModel::new()).await);

        let req = Request::builder()
            .uri("/api/chat/conversations")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn list_conversations_returns_seeded_page() {
        let app = build_router(test_state(ScriptedModel::new()).await);

        let req = Request::builder()
            .uri("/api/chat/conversations?user_id=user-001")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["pagination"]["total"], 1);
        assert_eq!(parsed["data"][0]["title"], "Order status inquiry");
    }
}
