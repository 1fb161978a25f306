use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use taskdeck_core::model::{
    validate_chat_input, validate_message, Chat, ChatDetail, ChatInput, ChatMessage,
};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chats", get(list_chats).post(create_chat))
        .route("/api/chats/config", get(chat_config))
        .route("/api/chats/{id}", get(get_chat).delete(delete_chat))
        .route("/api/chats/{id}/messages", post(send_message))
}

#[derive(Debug, Clone, Deserialize)]
struct SendMessageInput {
    message: String,
}

async fn list_chats(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Chat>>, ApiError> {
    let chats = state.storage.list_chats().await?;
    Ok(Json(chats))
}

async fn create_chat(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ChatInput>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    validate_chat_input(&input)?;
    let chat = state.storage.create_chat(&input).await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ChatDetail>, ApiError> {
    let detail = state.storage.get_chat(id).await?;
    Ok(Json(detail))
}

/// Messages go with the chat, the schema cascades the delete.
async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_chat(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tells the frontend whether the assistant can be used, and if not,
/// which setting is missing.
async fn chat_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let enabled = state.agent.is_some();
    Json(serde_json::json!({
        "enabled": enabled,
        "missing": if enabled { None } else { state.config.agent.missing_setting() },
    }))
}

/// Persists the user message, asks the agent for a reply with the full
/// chat history as context, persists the reply, and returns both new
/// messages. If the agent call fails the user message stays persisted
/// and the failure surfaces as a gateway error.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<SendMessageInput>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    // Check order matters for the response code: unknown chat is 404
    // even when the message is invalid or the assistant is off.
    let history = state.storage.get_chat(id).await?.messages;
    validate_message(&input.message)?;
    let agent = state
        .agent
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("chat assistant is not configured"))?;

    let user_message = state.storage.append_message(id, &input.message, false).await?;
    let reply = agent.reply(&history, &input.message).await?;
    let bot_message = state.storage.append_message(id, &reply, true).await?;

    Ok(Json(vec![user_message, bot_message]))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn seed_chat(app: &axum::Router, title: Option<&str>) -> i64 {
        let payload = match title {
            Some(t) => serde_json::json!({"title": t}),
            None => serde_json::json!({}),
        };
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/chats", payload))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp.into_body()).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_chat() {
        let app = test_router();
        let id = seed_chat(&app, Some("deploy questions")).await;

        let resp = app
            .oneshot(get_request(&format!("/api/chats/{id}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail = body_json(resp.into_body()).await;
        assert_eq!(detail["title"], "deploy questions");
        assert_eq!(detail["messages"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_chat_title_is_optional() {
        let app = test_router();
        let id = seed_chat(&app, None).await;

        let resp = app
            .oneshot(get_request(&format!("/api/chats/{id}")))
            .await
            .unwrap();
        let detail = body_json(resp.into_body()).await;
        assert!(detail["title"].is_null());
    }

    #[tokio::test]
    async fn test_list_chats_newest_first() {
        let app = test_router();
        let first = seed_chat(&app, Some("first")).await;
        let second = seed_chat(&app, Some("second")).await;

        let resp = app.oneshot(get_request("/api/chats")).await.unwrap();
        let chats = body_json(resp.into_body()).await;
        let ids: Vec<i64> = chats
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_send_message_without_agent_is_503() {
        let app = test_router();
        let id = seed_chat(&app, None).await;

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/chats/{id}/messages"),
                serde_json::json!({"message": "hello?"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        // Nothing persisted when the gate refuses.
        let resp = app
            .oneshot(get_request(&format!("/api/chats/{id}")))
            .await
            .unwrap();
        let detail = body_json(resp.into_body()).await;
        assert_eq!(detail["messages"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_send_message_blank_is_400() {
        let app = test_router();
        let id = seed_chat(&app, None).await;

        let resp = app
            .oneshot(json_request(
                "POST",
                &format!("/api/chats/{id}/messages"),
                serde_json::json!({"message": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_message_to_missing_chat_is_404() {
        // No agent configured: the chat lookup still wins, 404 not 503.
        let app = test_router();

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chats/99/messages",
                serde_json::json!({"message": "anyone there?"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_agent_failure_keeps_user_message() {
        let app = test_router_with_agent();

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/chats", serde_json::json!({})))
            .await
            .unwrap();
        let id = body_json(resp.into_body()).await["id"].as_i64().unwrap();

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/chats/{id}/messages"),
                serde_json::json!({"message": "will not get an answer"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = app
            .oneshot(get_request(&format!("/api/chats/{id}")))
            .await
            .unwrap();
        let detail = body_json(resp.into_body()).await;
        let messages = detail["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["message"], "will not get an answer");
        assert_eq!(messages[0]["is_bot"], false);
    }

    #[tokio::test]
    async fn test_send_message_appends_reply_in_order() {
        // Stub chat-completions service with one canned reply.
        let stub = axum::Router::new().route(
            "/v1/chat/completions",
            axum::routing::post(|| async {
                axum::Json(serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "try PT2H"}}
                    ]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        let app = test_router_with_agent_at(&format!("http://{addr}"));

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/chats", serde_json::json!({})))
            .await
            .unwrap();
        let id = body_json(resp.into_body()).await["id"].as_i64().unwrap();

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/chats/{id}/messages"),
                serde_json::json!({"message": "how long should this take?"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let pair = body_json(resp.into_body()).await;
        assert_eq!(pair.as_array().unwrap().len(), 2);
        assert_eq!(pair[0]["is_bot"], false);
        assert_eq!(pair[1]["is_bot"], true);
        assert_eq!(pair[1]["message"], "try PT2H");

        let resp = app
            .oneshot(get_request(&format!("/api/chats/{id}")))
            .await
            .unwrap();
        let detail = body_json(resp.into_body()).await;
        let messages = detail["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["message"], "how long should this take?");
        assert_eq!(messages[0]["is_bot"], false);
        assert_eq!(messages[1]["message"], "try PT2H");
        assert_eq!(messages[1]["is_bot"], true);
    }

    #[tokio::test]
    async fn test_delete_chat_removes_messages() {
        let app = test_router();
        let id = seed_chat(&app, Some("short lived")).await;

        let resp = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/chats/{id}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(get_request(&format!("/api/chats/{id}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_config_reports_disabled() {
        let app = test_router();
        let resp = app.oneshot(get_request("/api/chats/config")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let config = body_json(resp.into_body()).await;
        assert_eq!(config["enabled"], false);
        assert_eq!(config["missing"], "agent.enabled");
    }
}
