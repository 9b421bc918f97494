//! Quota reporting for PROPFIND.
use crate::fs::DavFileSystem;

/// Space usage as reported in `quota-used-bytes` / `quota-available-bytes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quota {
    pub used: u64,
    pub available: u64,
}

/// Ask the store for `(used, total)` and derive the available space.
///
/// A store without capacity information (or one that fails to answer)
/// is reported as zero used, zero available.
pub(crate) async fn quota(fs: &dyn DavFileSystem) -> Quota {
    match fs.get_quota().await {
        Ok((used, total)) => Quota {
            used,
            available: total.saturating_sub(used),
        },
        Err(e) => {
            trace!("quota unavailable: {e}");
            Quota::default()
        }
    }
}
