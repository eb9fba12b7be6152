//! Axum front door serving Markdown to AI agents in front of a site.

pub mod front_door;
pub mod state;

use std::path::Path;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use agentmd_core::build_site_index;

pub use front_door::{LLMS_TXT_PATH, SIGNAL_HEADER, cache_control, etag, front_door};
pub use state::AppState;

/// The site in `site_dir` behind the Markdown front door, plus `/llms.txt`.
pub fn router(state: AppState, site_dir: &Path) -> Router {
    Router::new()
        .route(LLMS_TXT_PATH, get(llms_txt))
        .fallback_service(ServeDir::new(site_dir))
        .layer(middleware::from_fn_with_state(state.clone(), front_door))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Renders the index of curated artifacts.
async fn llms_txt(State(state): State<AppState>) -> Response {
    let root = state.content_root.clone();
    let artifact_name = state.artifact_name.clone();
    let title = state.site_title.clone();
    let built = tokio::task::spawn_blocking(move || build_site_index(&root, &artifact_name, &title)).await;

    match built {
        Ok(Ok(index)) => (
            [(CONTENT_TYPE, "text/plain; charset=utf-8"), (CACHE_CONTROL, "public, max-age=300")],
            index.render(),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed to build site index");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!(error = %e, "site index task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmd_core::AgentMdConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::http::header::{ACCEPT, ETAG, USER_AGENT, VARY};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Fixture {
        _tmp: TempDir,
        app: Router,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let site = tmp.path().join("public");
        fs::create_dir_all(content.join("pricing")).unwrap();
        fs::create_dir_all(content.join("home")).unwrap();
        fs::create_dir_all(&site).unwrap();
        fs::write(content.join("page.md"), "# Welcome\n").unwrap();
        fs::write(content.join("pricing/page.md"), "# Pricing\n").unwrap();
        fs::write(content.join("home/page.md"), "---\nredirect: /\n---").unwrap();
        fs::write(site.join("index.html"), "<html><body><h1>Welcome</h1></body></html>").unwrap();

        let config = AgentMdConfig::builder()
            .content_root(&content)
            .exclude_path("/api/*")
            .site_title("Example")
            .build();
        let state = AppState::from_config(&config).unwrap();
        Fixture { app: router(state, &site), _tmp: tmp }
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(uri: &str) -> axum::http::request::Builder {
        Request::builder().method("GET").uri(uri)
    }

    #[tokio::test]
    async fn test_md_suffix_serves_curated() {
        let fx = fixture();
        let response = fx.app.oneshot(get_request("/pricing.md").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/markdown; charset=utf-8");
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), cache_control(agentmd_core::CachePolicy::Public));
        assert_eq!(headers.get(SIGNAL_HEADER).unwrap(), "md-suffix");
        assert_eq!(headers.get(ETAG).unwrap(), etag("# Pricing\n").as_str());
        assert!(headers.get(VARY).is_some());
        assert_eq!(body_text(response).await, "# Pricing\n");
    }

    #[tokio::test]
    async fn test_accept_header_follows_alias() {
        let fx = fixture();
        let request = get_request("/home").header(ACCEPT, "text/markdown").body(Body::empty()).unwrap();
        let response = fx.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(SIGNAL_HEADER).unwrap(), "accept;q=1");
        assert_eq!(body_text(response).await, "# Welcome\n");
    }

    #[tokio::test]
    async fn test_bot_user_agent() {
        let fx = fixture();
        let request = get_request("/")
            .header(USER_AGENT, "Mozilla/5.0 (compatible; ClaudeBot/1.0)")
            .body(Body::empty())
            .unwrap();
        let response = fx.app.oneshot(request).await.unwrap();
        assert_eq!(response.headers().get(SIGNAL_HEADER).unwrap(), "user-agent=ClaudeBot");
        assert_eq!(body_text(response).await, "# Welcome\n");
    }

    #[tokio::test]
    async fn test_browser_gets_site() {
        let fx = fixture();
        let request = get_request("/").header(ACCEPT, "text/html").body(Body::empty()).unwrap();
        let response = fx.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(VARY).unwrap(), "accept, user-agent");
        assert!(body_text(response).await.contains("<h1>Welcome</h1>"));
    }

    #[tokio::test]
    async fn test_missing_markdown_is_404() {
        let fx = fixture();
        let response = fx.app.oneshot(get_request("/nope.md").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_excluded_path_passes_through() {
        let fx = fixture();
        let response = fx.app.oneshot(get_request("/api/x.md").body(Body::empty()).unwrap()).await.unwrap();
        assert!(response.headers().get(SIGNAL_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_internal_fetch_passes_through() {
        let fx = fixture();
        let request = get_request("/")
            .header(ACCEPT, "text/markdown")
            .header(agentmd_core::INTERNAL_FETCH_HEADER, "1")
            .body(Body::empty())
            .unwrap();
        let response = fx.app.oneshot(request).await.unwrap();
        assert!(response.headers().get(SIGNAL_HEADER).is_none());
        assert!(body_text(response).await.contains("<h1>Welcome</h1>"));
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let fx = fixture();
        let request = Request::builder().method("POST").uri("/pricing.md").body(Body::empty()).unwrap();
        let response = fx.app.oneshot(request).await.unwrap();
        assert!(response.headers().get(SIGNAL_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_llms_txt() {
        let fx = fixture();
        let request = get_request("/llms.txt").header(ACCEPT, "text/markdown").body(Body::empty()).unwrap();
        let response = fx.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.starts_with("# Example\n"));
        assert!(text.contains("(/pricing.md)"));
        assert!(!text.contains("/home"));
    }
}
