//! Artifact metadata parsing.
//!
//! An artifact may open with a `---` fenced YAML block. The only key the
//! resolver acts on is `redirect`, which names another logical path to
//! serve instead:
//!
//! ```text
//! ---
//! redirect: /
//! ---
//! ```
//!
//! An artifact without an opening fence, or with an unterminated one, has
//! no metadata and its full text is the body.

use serde_yml as yml;

const FENCE: &str = "---";

/// A parsed curated artifact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Artifact {
    /// Alias target from the first `redirect:` line, if any.
    pub redirect_target: Option<String>,
    /// Raw metadata block between the fences.
    pub metadata: Option<String>,
    /// The metadata block as YAML; `None` when it does not parse.
    pub fields: Option<yml::Value>,
    /// Text after the metadata block (the whole text when there is none).
    pub body: String,
}

impl Artifact {
    /// A scalar metadata field as trimmed text. Mappings, sequences and
    /// empty values read as absent.
    pub fn field(&self, key: &str) -> Option<String> {
        let text = match self.fields.as_ref()?.get(key)? {
            yml::Value::String(s) => s.trim().to_string(),
            yml::Value::Number(n) => n.to_string(),
            yml::Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Splits an artifact into metadata and body.
pub fn parse_artifact(text: &str) -> Artifact {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Some(rest) = strip_fence_line(text) else {
        return Artifact { body: text.to_string(), ..Default::default() };
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if content == FENCE {
            let metadata = rest[..offset].trim_end_matches(['\n', '\r']).to_string();
            let after = &rest[offset + FENCE.len()..];
            let body = after
                .strip_prefix("\r\n")
                .or_else(|| after.strip_prefix('\n'))
                .unwrap_or(after)
                .to_string();
            let redirect_target = find_field(&metadata, "redirect").map(str::to_string);
            let fields = yml::from_str::<yml::Value>(&metadata).ok();
            return Artifact { redirect_target, metadata: Some(metadata), fields, body };
        }
        offset += line.len();
    }

    Artifact { body: text.to_string(), ..Default::default() }
}

/// Returns the text after an opening `---` line.
fn strip_fence_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// First `key:` line in the block, used for `redirect` so a malformed block
/// still aliases.
fn find_field<'a>(block: &'a str, key: &str) -> Option<&'a str> {
    block.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim() != key {
            return None;
        }
        let value = unquote(value.trim());
        (!value.is_empty()).then_some(value)
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}
