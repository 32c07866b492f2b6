use mime::Mime;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// File served for `/` and for any path that does not resolve to a file.
pub const DEFAULT_ENTRY: &str = "index.html";

/// Extensions with an explicit entry in the table, without the leading dot.
pub const KNOWN_EXTENSIONS: [&str; 9] = [
    "html", "css", "js", "json", "png", "jpg", "gif", "svg", "ico",
];

static IMAGE_X_ICON: Lazy<Mime> =
    Lazy::new(|| "image/x-icon".parse().expect("valid icon mime literal"));

/// Returns the content type for `path` based on its extension.
///
/// This is a fixed, best-effort table; anything it does not list is served as
/// `text/plain`. Matching ignores ASCII case.
pub fn content_type_for(path: &Path) -> Mime {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") => mime::TEXT_HTML,
        Some("css") => mime::TEXT_CSS,
        Some("js") => mime::TEXT_JAVASCRIPT,
        Some("json") => mime::APPLICATION_JSON,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        Some("ico") => IMAGE_X_ICON.clone(),
        _ => mime::TEXT_PLAIN,
    }
}

/// Maps a URL path onto a file below `root`.
///
/// The path is percent-decoded first. An empty path (or `/`) resolves to the
/// entry document. Returns `None` when the path cannot be decoded or would
/// leave `root`; callers treat that the same as a missing file.
pub fn resolve_request_path(root: &Path, request_path: &str, entry: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return Some(root.join(entry));
    }
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}
