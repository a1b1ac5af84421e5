//! Virtual path handling.
//!
//! Logical paths are absolute, `/`-delimited and unescaped (`/trunk/Esc Folder+`).
//! Percent-escaping is applied only when a path is turned into a request URL.

use std::borrow::Cow;

use crate::SvnError;

/// The root path of every session.
pub const ROOT: &str = "/";

fn canonicalize(path: &str) -> Result<Cow<'_, str>, SvnError> {
    if path.chars().any(char::is_control) {
        return Err(SvnError::InvalidPath(format!(
            "control character in path: {path:?}"
        )));
    }

    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Cow::Borrowed(ROOT));
    }

    let mut out = String::with_capacity(trimmed.len() + 1);
    for seg in trimmed.split('/') {
        if seg.is_empty() || seg == "." {
            continue;
        }
        let seg = decode_segment(seg);
        if seg == ".." {
            return Err(SvnError::InvalidPath(format!("unsafe path: {path}")));
        }
        if seg.contains('/') || seg.chars().any(char::is_control) {
            return Err(SvnError::InvalidPath(format!(
                "escaped separator or control character in path: {path}"
            )));
        }
        out.push('/');
        out.push_str(&seg);
    }

    if out.is_empty() {
        return Ok(Cow::Borrowed(ROOT));
    }
    if out == path {
        return Ok(Cow::Borrowed(path));
    }
    Ok(Cow::Owned(out))
}

// `+` stays a literal plus: only `%XX` sequences are decoded.
fn decode_segment(seg: &str) -> Cow<'_, str> {
    if !seg.contains('%') {
        return Cow::Borrowed(seg);
    }
    match urlencoding::decode(seg) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(seg),
    }
}

/// Normalizes a raw user path into an absolute logical path.
///
/// An empty string denotes the root. The leading slash is optional, redundant
/// separators and `.` segments are collapsed and trailing slashes dropped.
/// Segments written with manual percent-escapes resolve to the same logical
/// name as their unescaped form. `..` segments and control characters are
/// rejected with [`SvnError::InvalidPath`].
///
/// # Examples
///
/// ```
/// assert_eq!(svnfs::path::normalize("").unwrap(), "/");
/// assert_eq!(svnfs::path::normalize("trunk//Source/").unwrap(), "/trunk/Source");
/// assert_eq!(svnfs::path::normalize("/a/Esc%20Folder+").unwrap(), "/a/Esc Folder+");
/// ```
pub fn normalize(path: &str) -> Result<String, SvnError> {
    Ok(canonicalize(path)?.into_owned())
}

pub(crate) fn normalize_ref(path: &str) -> Result<Cow<'_, str>, SvnError> {
    canonicalize(path)
}

/// Returns the parent of a normalized path, or `None` for the root.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == ROOT || path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => Some(ROOT),
    }
}

/// Returns the last segment of a normalized path (`""` for the root).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// Appends `name` to the normalized directory path `dir`.
pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Percent-escapes each segment of a normalized path for use in a request URL.
///
/// The result keeps the leading slash and has no trailing slash (except for
/// the root, which stays `/`).
pub fn escape_for_request(path: &str) -> String {
    if path == ROOT || path.is_empty() {
        return ROOT.to_string();
    }
    let mut out = String::with_capacity(path.len() + 8);
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(&urlencoding::encode(seg));
    }
    out
}

/// Decodes a (possibly absolute-URL) `href` from a server response into an
/// unescaped URL path without a trailing slash.
pub(crate) fn decode_href(href: &str) -> String {
    let href = href.trim();
    let path = match href.find("://") {
        Some(idx) => {
            let after = &href[idx + 3..];
            after.find('/').map_or("/", |slash| &after[slash..])
        }
        None => href,
    };
    let decoded = urlencoding::decode(path).map_or_else(|_| path.to_string(), Cow::into_owned);
    let trimmed = decoded.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT.to_string()
    } else {
        trimmed.to_string()
    }
}
