//! Etag generation.
//!
//! Etags are derived from the rendered href and the formatted
//! last-modified time, never from file content. Two files with the
//! same path and timestamp get the same etag; changing either one
//! changes it.
use sha2::{Digest, Sha256};

/// Hash primitive used to turn `href + last-modified` into an etag.
pub trait ETagHasher: Send + Sync {
    /// Return an opaque etag string for `input`.
    fn etag(&self, input: &str) -> String;
}

/// Default hasher: lowercase hex SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ETag;

impl ETagHasher for Sha256ETag {
    fn etag(&self, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Etag for a file at `href` last modified at `lastmodified`.
pub(crate) fn file_etag(hasher: &dyn ETagHasher, href: &str, lastmodified: &str) -> String {
    let mut input = String::with_capacity(href.len() + lastmodified.len());
    input.push_str(href);
    input.push_str(lastmodified);
    hasher.etag(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: &str = "Sun, 06 Nov 1994 08:49:37 GMT";
    const T2: &str = "Sun, 06 Nov 1994 08:49:38 GMT";

    #[test]
    fn same_path_and_time_same_etag() {
        let h = Sha256ETag;
        assert_eq!(
            file_etag(&h, "/dav/a.txt", T1),
            file_etag(&h, "/dav/a.txt", T1)
        );
    }

    #[test]
    fn path_or_time_change_etag() {
        let h = Sha256ETag;
        let base = file_etag(&h, "/dav/a.txt", T1);
        assert_ne!(base, file_etag(&h, "/dav/b.txt", T1));
        assert_ne!(base, file_etag(&h, "/dav/a.txt", T2));
    }

    #[test]
    fn hex_sha256() {
        // sha256("abc")
        assert_eq!(
            Sha256ETag.etag("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(file_etag(&Sha256ETag, "a", "bc"), Sha256ETag.etag("abc"));
    }
}
