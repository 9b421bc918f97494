//! Classify a request path against the store.
use http::uri::Uri;

use crate::davpath::DavPath;
use crate::fs::DavFileSystem;
use crate::DavResult;

/// What the store has at a path. Looked up fresh for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    None,
    File,
    Directory,
}

impl ResourceType {
    pub fn exists(self) -> bool {
        self != ResourceType::None
    }
}

/// Look up `path` in the store. Any store failure counts as absent.
pub(crate) async fn resource_type(fs: &dyn DavFileSystem, path: &DavPath) -> ResourceType {
    match fs.metadata(path).await {
        Ok(meta) if meta.is_dir() => ResourceType::Directory,
        Ok(_) => ResourceType::File,
        Err(e) => {
            debug!("resolve {path:?}: {e}");
            ResourceType::None
        }
    }
}

/// Normalize the request URI against the mount prefix and classify it.
///
/// Only fails when the URI is not under the prefix or cannot be
/// decoded; the caller answers that with the default 404.
pub(crate) async fn resolve(
    fs: &dyn DavFileSystem,
    uri: &Uri,
    prefix: &str,
) -> DavResult<(DavPath, ResourceType)> {
    let path = DavPath::from_uri_and_prefix(uri, prefix)?;
    let rt = resource_type(fs, &path).await;
    Ok((path, rt))
}
