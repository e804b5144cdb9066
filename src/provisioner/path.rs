//! Filesystem path construction and endpoint encoding.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped when a filesystem path becomes one URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `<pool>/<name>`, ignoring stray separators around the pool.
#[must_use]
pub fn filesystem_path(pool: &str, name: &str) -> String {
    format!("{}/{}", pool.trim_matches('/'), name.trim())
}

/// Export path as mounted by clients: the filesystem path with a leading `/`.
#[must_use]
pub fn export_path(filesystem_path: &str) -> String {
    format!("/{filesystem_path}")
}

/// Turns an export path into the single path segment used by
/// `DELETE storage/filesystems/<segment>`. Returns `None` for an empty path.
#[must_use]
pub fn encode_filesystem_path(export_path: &str) -> Option<String> {
    let relative = export_path.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    Some(utf8_percent_encode(relative, SEGMENT).to_string())
}
