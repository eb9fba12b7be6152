//! Logical path validation.
//!
//! Every path that could reach the filesystem or the network goes through
//! [`is_valid_path`] first: the inbound request path, alias targets read
//! from artifact metadata, and redirect locations.

/// Returns true when `path` is a rooted, same-origin, traversal-free path.
///
/// Rejects empty paths, paths not starting with exactly one `/`
/// (protocol-relative `//host` included), anything containing `://`, and
/// any `.` or `..` segment.
pub fn is_valid_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") {
        return false;
    }

    if path.contains("://") {
        return false;
    }

    // Backslashes are segment separators for some clients and filesystems.
    if path.contains('\\') || path.contains('\0') {
        return false;
    }

    !path.split('/').any(|segment| segment == "." || segment == "..")
}

/// Splits a validated logical path into its non-empty segments.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
