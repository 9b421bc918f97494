//! Utility module to handle the path part of an URL as a filesystem path.
//!
use std::path::PathBuf;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::errors::DavError;

// Characters that must be escaped when a path is put back into an href.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Path relative to the mount prefix.
///
/// Always starts with `/`, is `/` for the mount root, and never ends
/// in a slash otherwise. The stored path is percent-decoded; it is
/// re-encoded when turned back into an href.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DavPath {
    path: String,
    prefix: String,
}

impl std::fmt::Display for DavPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_url_string())
    }
}

impl std::fmt::Debug for DavPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

// strip the mount prefix off `path`. The prefix must match on a
// segment boundary: "/dav" matches "/dav" and "/dav/x" but not "/davx".
fn strip_mount_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

// decode and canonicalize the part after the prefix.
fn normalize(rest: &str) -> Result<String, DavError> {
    let decoded = percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| DavError::IllegalPath)?;
    let mut path = String::with_capacity(decoded.len() + 1);
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(DavError::ForbiddenPath),
            s if s.contains('\0') => return Err(DavError::IllegalPath),
            s => {
                path.push('/');
                path.push_str(s);
            }
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    Ok(path)
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_end_matches('/').to_string()
}

impl DavPath {
    /// Build a path from the raw (still percent-encoded) request path,
    /// stripping `prefix`. Fails if the path is not under `prefix`.
    pub(crate) fn from_str_and_prefix(path: &str, prefix: &str) -> Result<DavPath, DavError> {
        let prefix = normalize_prefix(prefix);
        let rest = strip_mount_prefix(path, &prefix).ok_or(DavError::InvalidPath)?;
        Ok(DavPath {
            path: normalize(rest)?,
            prefix,
        })
    }

    /// Like `from_str_and_prefix`, from a request URI.
    pub(crate) fn from_uri_and_prefix(uri: &http::uri::Uri, prefix: &str) -> Result<DavPath, DavError> {
        Self::from_str_and_prefix(uri.path(), prefix)
    }

    /// Resolve a `Destination` header value.
    ///
    /// Accepts an absolute URL (scheme and authority are dropped) or a
    /// bare path. The mount prefix is stripped when present; a path
    /// without it is taken to be relative to the mount already.
    pub(crate) fn from_destination(dest: &str, prefix: &str) -> Result<DavPath, DavError> {
        let prefix = normalize_prefix(prefix);
        let path = if dest.starts_with("http://") || dest.starts_with("https://") {
            let url = url::Url::parse(dest).map_err(|_| DavError::InvalidPath)?;
            url.path().to_string()
        } else {
            dest.split(|c: char| c == '?' || c == '#').next().unwrap_or_default().to_string()
        };
        let rest = strip_mount_prefix(&path, &prefix).unwrap_or(&path);
        Ok(DavPath {
            path: normalize(rest)?,
            prefix,
        })
    }

    /// The normalized path, relative to the mount prefix.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Is this the mount root.
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Add a segment to the end of the path.
    pub(crate) fn push_segment(&mut self, segment: &[u8]) {
        if !self.is_root() {
            self.path.push('/');
        }
        self.path.push_str(&String::from_utf8_lossy(segment));
    }

    /// Last segment of the path, empty for the root.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// The path without leading slash, for joining onto a base directory.
    pub(crate) fn as_rel_ospath(&self) -> PathBuf {
        PathBuf::from(self.path.trim_start_matches('/'))
    }

    /// Prefix plus path, URL-escaped. This is what goes into an href.
    pub fn as_url_string(&self) -> String {
        let full = format!("{}{}", self.prefix, self.path);
        utf8_percent_encode(&full, PATH_ENCODE_SET).to_string()
    }

    /// Like `as_url_string`, but collections get a trailing slash.
    pub fn as_collection_url_string(&self) -> String {
        let mut s = self.as_url_string();
        if !s.ends_with('/') {
            s.push('/');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(path: &str) -> String {
        DavPath::from_str_and_prefix(path, "/dav").unwrap().as_str().to_string()
    }

    #[test]
    fn strips_prefix() {
        assert_eq!(p("/dav"), "/");
        assert_eq!(p("/dav/"), "/");
        assert_eq!(p("/dav/docs"), "/docs");
        assert_eq!(p("/dav/docs/"), "/docs");
        assert_eq!(p("/dav/docs/a.txt"), "/docs/a.txt");
        assert_eq!(p("/dav//docs//a.txt"), "/docs/a.txt");
    }

    #[test]
    fn never_trailing_slash() {
        for raw in ["/dav/a/", "/dav/a/b/", "/dav/a/./", "/dav/a b/"] {
            let s = p(raw);
            assert!(!s.ends_with('/'), "{raw} -> {s}");
        }
    }

    #[test]
    fn outside_prefix() {
        assert!(DavPath::from_str_and_prefix("/other/x", "/dav").is_err());
        assert!(DavPath::from_str_and_prefix("/davx", "/dav").is_err());
        assert!(DavPath::from_str_and_prefix("/dav/../etc", "/dav").is_err());
    }

    #[test]
    fn empty_prefix() {
        let path = DavPath::from_str_and_prefix("/a/b/", "").unwrap();
        assert_eq!(path.as_str(), "/a/b");
        assert_eq!(path.as_url_string(), "/a/b");
        let root = DavPath::from_str_and_prefix("/", "/").unwrap();
        assert!(root.is_root());
        assert_eq!(root.as_collection_url_string(), "/");
    }

    #[test]
    fn escaping() {
        let path = DavPath::from_str_and_prefix("/dav/my%20docs/a%20b.txt", "/dav").unwrap();
        assert_eq!(path.as_str(), "/my docs/a b.txt");
        assert_eq!(path.as_url_string(), "/dav/my%20docs/a%20b.txt");
        assert_eq!(path.file_name(), "a b.txt");
    }

    #[test]
    fn collection_href() {
        let root = DavPath::from_str_and_prefix("/dav", "/dav").unwrap();
        assert_eq!(root.as_collection_url_string(), "/dav/");
        let mut docs = DavPath::from_str_and_prefix("/dav/docs", "/dav/").unwrap();
        assert_eq!(docs.as_collection_url_string(), "/dav/docs/");
        docs.push_segment(b"a.txt");
        assert_eq!(docs.as_url_string(), "/dav/docs/a.txt");
    }

    #[test]
    fn destination_forms_agree() {
        let abs = DavPath::from_destination("http://host/dav/b.txt", "/dav").unwrap();
        let tls = DavPath::from_destination("https://host:8443/dav/b.txt", "/dav").unwrap();
        let full = DavPath::from_destination("/dav/b.txt", "/dav").unwrap();
        let rel = DavPath::from_destination("/b.txt", "/dav").unwrap();
        assert_eq!(abs.as_str(), "/b.txt");
        assert_eq!(abs, tls);
        assert_eq!(abs, full);
        assert_eq!(abs, rel);
    }
}
