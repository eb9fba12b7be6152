//! Library API integration tests
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use agentmd_core::*;
use http::{HeaderMap, HeaderValue, StatusCode};
use tempfile::TempDir;
use url::Url;

/// In-process stand-in for the host site.
#[derive(Clone, Default)]
struct Origin {
    pages: HashMap<String, (u16, Vec<(&'static str, String)>, String)>,
    hits: Arc<AtomicUsize>,
}

impl Origin {
    fn page(mut self, path: &str, status: u16, headers: &[(&'static str, &str)], body: &str) -> Self {
        let headers = headers.iter().map(|(k, v)| (*k, v.to_string())).collect();
        self.pages.insert(path.to_string(), (status, headers, body.to_string()));
        self
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Fetcher for Origin {
    type Body = BufferedBody;

    async fn fetch(&self, url: &Url, _headers: HeaderMap) -> Result<FetchResponse<BufferedBody>> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let (status, headers, body) = self
            .pages
            .get(url.path())
            .cloned()
            .unwrap_or((404, Vec::new(), String::new()));
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(name, HeaderValue::from_str(&value).unwrap());
        }
        Ok(FetchResponse { status: StatusCode::from_u16(status).unwrap(), headers: map, body: BufferedBody::new(body) })
    }
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn resolver(root: &Path, origin: Origin) -> Resolver<FsContentTree, Origin, HtmlToMarkdown> {
    let store = ArtifactStore::new(FsContentTree::new(root), DEFAULT_ARTIFACT_NAME);
    let guard = LiveFetchGuard::new(origin, HtmlToMarkdown, Url::parse("http://127.0.0.1:3000").unwrap());
    Resolver::new(store).with_live_fetch(guard)
}

fn site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "page.md", "# Welcome\n\nThe home page.\n");
    write(tmp.path(), "pricing/page.md", "# Pricing\n\n| Plan | Price |\n|---|---|\n| Pro | $10 |\n");
    write(tmp.path(), "home/page.md", "---\nredirect: /\n---");
    write(tmp.path(), "(marketing)/customers/page.md", "# Customers\n");
    tmp
}

#[test]
fn test_suffix_priority_for_many_paths() {
    let options = DetectOptions::default();
    for path in ["/.md", "/a.md", "/docs/deep/page.md", "/x.y.md"] {
        let signal = detect(path, Some("text/markdown"), Some("GPTBot"), &options);
        assert!(matches!(signal, Some(Signal::MdSuffix { .. })), "{path}");
    }
}

#[test]
fn test_header_priority_over_agent() {
    let options = DetectOptions::default();
    for pattern in BOT_PATTERNS {
        let signal = detect("/pricing", Some("text/html, text/markdown;q=0.4"), Some(pattern), &options);
        assert_eq!(signal, Some(Signal::AcceptHeader { quality: 0.4 }));
    }
}

#[test]
fn test_detect_examples() {
    let options = DetectOptions::default();
    assert_eq!(detect("/.md", None, None, &options), Some(Signal::MdSuffix { original_path: "/".into() }));
    assert_eq!(
        detect("/pricing", Some("text/markdown;q=0.8"), None, &options),
        Some(Signal::AcceptHeader { quality: 0.8 })
    );
    assert_eq!(
        detect("/pricing", Some("text/markdown"), None, &options),
        Some(Signal::AcceptHeader { quality: 1.0 })
    );
}

#[tokio::test]
async fn test_curated_artifact_verbatim() {
    let tmp = site();
    let origin = Origin::default();
    let r = resolver(tmp.path(), origin.clone());
    let resolution = r.resolve("/pricing", None).await;
    let content = resolution.content().unwrap();
    assert_eq!(content.body, "# Pricing\n\n| Plan | Price |\n|---|---|\n| Pro | $10 |\n");
    assert_eq!(content.cache_policy, CachePolicy::Public);
    assert_eq!(origin.hits(), 0);
}

#[tokio::test]
async fn test_alias_only_artifact_resolves_target() {
    let tmp = site();
    let r = resolver(tmp.path(), Origin::default());
    assert_eq!(r.resolve("/home", None).await, r.resolve("/", None).await);
}

#[tokio::test]
async fn test_route_group_artifact() {
    let tmp = site();
    let r = resolver(tmp.path(), Origin::default());
    assert_eq!(r.resolve("/customers", None).await.content().unwrap().body, "# Customers\n");
}

#[tokio::test]
async fn test_live_page_converted() {
    let tmp = site();
    let origin = Origin::default().page(
        "/about",
        200,
        &[("content-type", "text/html")],
        "<html><body><nav>Menu</nav><main><h1>About</h1><p>Small team.</p></main></body></html>",
    );
    let r = resolver(tmp.path(), origin);
    let content = r.resolve("/about", Some("sid=1")).await.content().cloned().unwrap();
    assert_eq!(content.cache_policy, CachePolicy::Private);
    assert!(content.body.contains("About"));
    assert!(content.body.contains("Small team."));
    assert!(!content.body.contains("Menu"));
}

#[tokio::test]
async fn test_live_miss_is_not_found() {
    let tmp = site();
    let r = resolver(tmp.path(), Origin::default());
    assert_eq!(r.resolve("/nope", None).await, Resolution::NotFound);
}

#[tokio::test]
async fn test_foreign_redirect_is_not_found() {
    let tmp = site();
    let origin = Origin::default().page("/go", 302, &[("location", "https://attacker.example/")], "");
    let r = resolver(tmp.path(), origin.clone());
    assert_eq!(r.resolve("/go", Some("sid=secret")).await, Resolution::NotFound);
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_redirect_to_curated_artifact() {
    let tmp = site();
    let origin = Origin::default().page("/plans", 308, &[("location", "/pricing")], "");
    let r = resolver(tmp.path(), origin);
    let content = r.resolve("/plans", None).await.content().cloned().unwrap();
    assert!(content.body.starts_with("# Pricing"));
    assert_eq!(content.cache_policy, CachePolicy::Public);
}

#[tokio::test]
async fn test_declared_oversize_rejected() {
    let tmp = site();
    let declared = (MAX_BODY_BYTES + 1).to_string();
    let origin = Origin::default().page("/huge", 200, &[("content-length", &declared)], "<p>tiny</p>");
    let (resolution, trace) = resolver(tmp.path(), origin).resolve_traced("/huge", None).await;
    assert_eq!(resolution, Resolution::NotFound);
    assert!(matches!(trace.rejection, Some(Rejection::Oversized { actual: Some(_), .. })));
}

#[tokio::test]
async fn test_actual_oversize_rejected() {
    let tmp = site();
    let body = format!("<p>{}</p>", "a".repeat(MAX_BODY_BYTES));
    let origin = Origin::default().page("/huge", 200, &[], &body);
    let (resolution, trace) = resolver(tmp.path(), origin).resolve_traced("/huge", None).await;
    assert_eq!(resolution, Resolution::NotFound);
    assert_eq!(trace.rejection, Some(Rejection::Oversized { limit: MAX_BODY_BYTES, actual: None }));
}

#[tokio::test]
async fn test_invalid_input() {
    let tmp = site();
    let r = resolver(tmp.path(), Origin::default());
    assert_eq!(r.resolve("/../../etc/passwd", None).await, Resolution::InvalidInput);
    assert_eq!(r.resolve("//attacker.example", None).await, Resolution::InvalidInput);
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let tmp = site();
    let origin = Origin::default().page("/about", 200, &[], "<main><h1>About</h1></main>");
    let r = resolver(tmp.path(), origin);
    for path in ["/pricing", "/home", "/about"] {
        assert_eq!(r.resolve(path, None).await, r.resolve(path, None).await, "{path}");
    }
}

#[test]
fn test_site_index_lists_curated_pages() {
    let tmp = site();
    let index = build_site_index(tmp.path(), DEFAULT_ARTIFACT_NAME, "Example").unwrap();
    let paths: Vec<_> = index.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/customers", "/pricing"]);
}
