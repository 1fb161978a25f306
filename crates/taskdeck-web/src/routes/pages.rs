use std::sync::Arc;

use askama::Template;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(tasks_page))
        .route("/projects", get(projects_page))
        .route("/chat", get(chat_page))
}

// The pages are static shells; the data comes in over the JSON API
// from each page's own script.

#[derive(Template)]
#[template(path = "tasks.html")]
struct TasksTemplate;

#[derive(Template)]
#[template(path = "projects.html")]
struct ProjectsTemplate;

#[derive(Template)]
#[template(path = "chat.html")]
struct ChatTemplate;

async fn tasks_page() -> Result<Html<String>, AppError> {
    Ok(Html(TasksTemplate.render()?))
}

async fn projects_page() -> Result<Html<String>, AppError> {
    Ok(Html(ProjectsTemplate.render()?))
}

async fn chat_page() -> Result<Html<String>, AppError> {
    Ok(Html(ChatTemplate.render()?))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_text(body: axum::body::Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_tasks_page_renders() {
        let app = test_router();
        let resp = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("/api/tasks"));
    }

    #[tokio::test]
    async fn test_projects_page_renders() {
        let app = test_router();
        let resp = app.oneshot(get_request("/projects")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("/api/projects"));
    }

    #[tokio::test]
    async fn test_chat_page_renders() {
        let app = test_router();
        let resp = app.oneshot(get_request("/chat")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("/api/chats/config"));
    }

    #[tokio::test]
    async fn test_unknown_page_is_404() {
        let app = test_router();
        let resp = app.oneshot(get_request("/nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
