//! Request classification in front of the host site.
//!
//! Requests that carry a Markdown signal are answered here; everything else
//! continues to the site untouched. Every response gets a `vary` header so
//! shared caches keep the two representations apart.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCEPT, CACHE_CONTROL, CONTENT_TYPE, COOKIE, ETAG, HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH, USER_AGENT,
    VARY,
};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use tracing::info;

use agentmd_core::{CachePolicy, INTERNAL_FETCH_HEADER, Resolution, ResolvedContent, Signal};

use crate::state::AppState;

/// Path of the generated site index, never classified.
pub const LLMS_TXT_PATH: &str = "/llms.txt";

/// Transparency header naming the signal that produced a Markdown response.
pub const SIGNAL_HEADER: HeaderName = HeaderName::from_static("x-agentmd-signal");

const VARY_VALUE: &str = "accept, user-agent";

/// `cache-control` text for a cache policy.
pub fn cache_control(policy: CachePolicy) -> &'static str {
    match policy {
        CachePolicy::Public => "public, max-age=3600, s-maxage=86400",
        CachePolicy::Private => "private, max-age=60",
    }
}

/// Strong validator for a Markdown body.
pub fn etag(body: &str) -> String {
    format!("\"{:x}\"", Sha256::digest(body.as_bytes()))
}

/// Middleware answering Markdown requests before they reach the site.
pub async fn front_door(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let passthrough = request.headers().contains_key(INTERNAL_FETCH_HEADER)
        || !matches!(*request.method(), Method::GET | Method::HEAD)
        || path == LLMS_TXT_PATH;
    if passthrough {
        return with_vary(next.run(request).await);
    }

    let headers = request.headers();
    let signal = state
        .detector
        .classify(&path, header_str(headers, &ACCEPT), header_str(headers, &USER_AGENT));
    let cookies = header_str(headers, &COOKIE).map(str::to_string);
    let if_none_match = header_str(headers, &IF_NONE_MATCH).map(str::to_string);
    let Some(signal) = signal else {
        return with_vary(next.run(request).await);
    };

    let logical_path = signal.logical_path(&path).to_string();

    let resolution = state.resolver.resolve(&logical_path, cookies.as_deref()).await;
    info!(
        path = %path,
        signal = %signal.header_value(),
        found = matches!(resolution, Resolution::Found(_)),
        "markdown request"
    );

    with_vary(markdown_response(&signal, resolution, if_none_match.as_deref()))
}

fn markdown_response(signal: &Signal, resolution: Resolution, if_none_match: Option<&str>) -> Response {
    match resolution {
        Resolution::Found(content) => found_response(signal, content, if_none_match),
        Resolution::NotFound => {
            (StatusCode::NOT_FOUND, [(CONTENT_TYPE, "text/plain; charset=utf-8")], "Markdown not available\n")
                .into_response()
        }
        Resolution::InvalidInput => {
            (StatusCode::BAD_REQUEST, [(CONTENT_TYPE, "text/plain; charset=utf-8")], "Invalid path\n").into_response()
        }
    }
}

fn found_response(signal: &Signal, content: ResolvedContent, if_none_match: Option<&str>) -> Response {
    let tag = etag(&content.body);
    let not_modified = if_none_match.is_some_and(|value| value.split(',').any(|candidate| candidate.trim() == tag));

    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        let mut response = Response::new(Body::from(content.body));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/markdown; charset=utf-8"));
        response
    };

    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control(content.cache_policy)));
    if let Ok(value) = HeaderValue::from_str(&tag) {
        headers.insert(ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&signal.header_value()) {
        headers.insert(SIGNAL_HEADER, value);
    }
    response
}

fn with_vary(mut response: Response) -> Response {
    response.headers_mut().append(VARY, HeaderValue::from_static(VARY_VALUE));
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
