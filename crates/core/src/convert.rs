//! HTML to Markdown conversion for live pages.
//!
//! The resolver only needs something that turns markup into text; see
//! [`Converter`]. [`HtmlToMarkdown`] is the default: it drops non-content
//! elements, narrows the document to its main region and converts that
//! region with `htmd`.

use scraper::{Html, Selector};

/// Elements removed before conversion, including their contents.
const STRIPPED_TAGS: [&str; 7] = ["script", "style", "noscript", "iframe", "svg", "canvas", "template"];

/// Selectors tried in order to find the main content region.
const MAIN_SELECTORS: [&str; 4] = ["main", "[role=main]", "article", "body"];

/// Turns markup into text.
pub trait Converter: Send + Sync {
    fn convert(&self, markup: &str) -> String;
}

impl<F> Converter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn convert(&self, markup: &str) -> String {
        self(markup)
    }
}

/// Default converter: strip, select the main region, convert.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlToMarkdown;

impl Converter for HtmlToMarkdown {
    fn convert(&self, markup: &str) -> String {
        convert_html(markup)
    }
}

/// Converts an HTML page to Markdown.
pub fn convert_html(html: &str) -> String {
    let cleaned = remove_stripped_tags(html);
    let region = main_region(&cleaned).unwrap_or(cleaned);
    collapse_blank_lines(&html_to_markdown(&region))
}

/// Remove script, style and other non-content tags.
fn remove_stripped_tags(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: STRIPPED_TAGS
                .iter()
                .map(|tag| {
                    lol_html::element!(*tag, |el| {
                        el.remove();
                        Ok(())
                    })
                })
                .collect(),
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    output
}

/// Outer HTML of the first main-content candidate that has any text.
fn main_region(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for raw in MAIN_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document
            .select(&selector)
            .find(|el| el.text().any(|t| !t.trim().is_empty()))
        {
            return Some(element.html());
        }
    }

    None
}

#[cfg(feature = "markdown")]
fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_default()
}

/// Plain text fallback when the markdown feature is disabled.
#[cfg(not(feature = "markdown"))]
fn html_to_markdown(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    doc.root_element().text().collect::<Vec<_>>().join("\n")
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>About</title><style>body{color:red}</style></head>
<body>
<nav><a href="/">Home</a></nav>
<main><h1>About us</h1><p>We make <strong>tools</strong>.</p><script>track()</script></main>
<footer>© 2026</footer>
</body></html>"#;

    #[test]
    fn test_strips_script_and_style() {
        let cleaned = remove_stripped_tags(PAGE);
        assert!(!cleaned.contains("track()"));
        assert!(!cleaned.contains("color:red"));
        assert!(cleaned.contains("About us"));
    }

    #[test]
    fn test_main_region_preferred() {
        let region = main_region(PAGE).unwrap();
        assert!(region.starts_with("<main>"));
        assert!(!region.contains("footer"));
    }

    #[test]
    fn test_body_fallback() {
        let region = main_region("<html><body><p>Only body</p></body></html>").unwrap();
        assert!(region.contains("Only body"));
    }

    #[test]
    fn test_empty_main_skipped() {
        let html = "<html><body><main>  </main><article><p>Story</p></article></body></html>";
        let region = main_region(html).unwrap();
        assert!(region.starts_with("<article>"));
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_convert_html() {
        let md = convert_html(PAGE);
        assert!(md.contains("# About us"));
        assert!(md.contains("**tools**"));
        assert!(!md.contains("track()"));
        assert!(!md.contains("2026"));
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb  \n"), "a\n\nb\n");
    }

    #[test]
    fn test_closure_converter() {
        let upper = |s: &str| s.to_uppercase();
        assert_eq!(upper.convert("abc"), "ABC");
        assert!(HtmlToMarkdown.convert("<p>hi</p>").contains("hi"));
    }
}
