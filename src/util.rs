use std::io::{Cursor, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use bytes::Bytes;
use http::header::HeaderValue;
use time::format_description::FormatItem;
use time::macros::{format_description, offset};

use crate::errors::DavError;
use crate::DavResult;

/// The HTTP and WebDAV methods the handler knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DavMethod {
    Head = 0x0001,
    Get = 0x0002,
    Put = 0x0004,
    Patch = 0x0008,
    Options = 0x0010,
    PropFind = 0x0020,
    PropPatch = 0x0040,
    MkCol = 0x0080,
    Copy = 0x0100,
    Move = 0x0200,
    Delete = 0x0400,
    Lock = 0x0800,
    Unlock = 0x1000,
    Post = 0x2000,
}

bitflags! {
    /// A set of allowed [`DavMethod`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DavMethodSet: u32 {
        const HEAD = DavMethod::Head as u32;
        const GET = DavMethod::Get as u32;
        const PUT = DavMethod::Put as u32;
        const PATCH = DavMethod::Patch as u32;
        const OPTIONS = DavMethod::Options as u32;
        const PROPFIND = DavMethod::PropFind as u32;
        const PROPPATCH = DavMethod::PropPatch as u32;
        const MKCOL = DavMethod::MkCol as u32;
        const COPY = DavMethod::Copy as u32;
        const MOVE = DavMethod::Move as u32;
        const DELETE = DavMethod::Delete as u32;
        const LOCK = DavMethod::Lock as u32;
        const UNLOCK = DavMethod::Unlock as u32;
        const POST = DavMethod::Post as u32;
    }
}

impl From<DavMethod> for DavMethodSet {
    fn from(m: DavMethod) -> Self {
        DavMethodSet::from_bits_retain(m as u32)
    }
}

// Order in which methods are listed in an Allow: header.
const ALLOW_ORDER: &[(DavMethodSet, &str)] = &[
    (DavMethodSet::PROPPATCH, "PROPPATCH"),
    (DavMethodSet::PROPFIND, "PROPFIND"),
    (DavMethodSet::OPTIONS, "OPTIONS"),
    (DavMethodSet::MKCOL, "MKCOL"),
    (DavMethodSet::DELETE, "DELETE"),
    (DavMethodSet::UNLOCK, "UNLOCK"),
    (DavMethodSet::COPY, "COPY"),
    (DavMethodSet::LOCK, "LOCK"),
    (DavMethodSet::MOVE, "MOVE"),
    (DavMethodSet::HEAD, "HEAD"),
    (DavMethodSet::POST, "POST"),
    (DavMethodSet::PATCH, "PATCH"),
    (DavMethodSet::PUT, "PUT"),
    (DavMethodSet::GET, "GET"),
];

const fn set(bits: u32) -> DavMethodSet {
    DavMethodSet::from_bits_retain(bits)
}

impl DavMethodSet {
    pub const WEBDAV_RW: Self = Self::all();

    /// Advertised for an existing file.
    pub const ALLOW_FILE: Self = set(Self::PROPFIND.bits()
        | Self::OPTIONS.bits()
        | Self::DELETE.bits()
        | Self::COPY.bits()
        | Self::MOVE.bits()
        | Self::HEAD.bits()
        | Self::POST.bits()
        | Self::PUT.bits()
        | Self::GET.bits());

    /// Advertised for an existing collection.
    pub const ALLOW_COLLECTION: Self = set(Self::PROPFIND.bits()
        | Self::OPTIONS.bits()
        | Self::DELETE.bits()
        | Self::COPY.bits()
        | Self::MOVE.bits());

    /// Advertised with LOCK and UNLOCK responses.
    pub const ALLOW_LOCKED: Self = set(Self::ALLOW_FILE.bits()
        | Self::PROPPATCH.bits()
        | Self::UNLOCK.bits()
        | Self::LOCK.bits());

    /// Advertised once a resource is gone (after MOVE or DELETE).
    pub const ALLOW_UNMAPPED: Self = set(Self::OPTIONS.bits()
        | Self::MKCOL.bits()
        | Self::LOCK.bits()
        | Self::POST.bits()
        | Self::PUT.bits());

    /// Advertised with every 404.
    pub const ALLOW_NOT_FOUND: Self =
        set(Self::OPTIONS.bits() | Self::MKCOL.bits() | Self::POST.bits() | Self::PUT.bits());

    /// Is `m` in this set.
    pub fn allows(self, m: DavMethod) -> bool {
        self.contains(m.into())
    }

    /// Comma separated method list, as used in the `Allow` header.
    pub fn allow_string(self) -> String {
        ALLOW_ORDER
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn allow_header(self) -> HeaderValue {
        // method names are plain ASCII.
        HeaderValue::from_str(&self.allow_string()).unwrap_or(HeaderValue::from_static(""))
    }
}

// translate method into our own enum that has webdav methods as well.
pub(crate) fn dav_method(m: &http::Method) -> DavResult<DavMethod> {
    let m = match *m {
        http::Method::HEAD => DavMethod::Head,
        http::Method::GET => DavMethod::Get,
        http::Method::PUT => DavMethod::Put,
        http::Method::PATCH => DavMethod::Patch,
        http::Method::POST => DavMethod::Post,
        http::Method::DELETE => DavMethod::Delete,
        http::Method::OPTIONS => DavMethod::Options,
        _ => match m.as_str() {
            "PROPFIND" => DavMethod::PropFind,
            "PROPPATCH" => DavMethod::PropPatch,
            "MKCOL" => DavMethod::MkCol,
            "COPY" => DavMethod::Copy,
            "MOVE" => DavMethod::Move,
            "LOCK" => DavMethod::Lock,
            "UNLOCK" => DavMethod::Unlock,
            _ => {
                return Err(DavError::UnknownDavMethod);
            }
        },
    };
    Ok(m)
}

const RFC1123: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

pub(crate) fn systemtime_to_offsetdatetime(t: SystemTime) -> time::OffsetDateTime {
    let secs = match t.duration_since(UNIX_EPOCH) {
        Ok(t) => t.as_secs() as i64,
        Err(_) => 0,
    };
    time::OffsetDateTime::from_unix_timestamp(secs)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
        .to_offset(offset!(UTC))
}

/// Format as an RFC 1123 date: `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn systemtime_to_httpdate(t: SystemTime) -> String {
    systemtime_to_offsetdatetime(t)
        .format(RFC1123)
        .unwrap_or_default()
}

// A buffer that implements "Write".
#[derive(Clone, Default)]
pub(crate) struct MemBuffer(Cursor<Vec<u8>>);

impl MemBuffer {
    pub fn new() -> MemBuffer {
        MemBuffer(Cursor::new(Vec::new()))
    }

    pub fn take(&mut self) -> Bytes {
        let buf = std::mem::take(self.0.get_mut());
        self.0.set_position(0);
        Bytes::from(buf)
    }
}

impl Write for MemBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_httpdate() {
        assert_eq!(
            systemtime_to_httpdate(UNIX_EPOCH),
            "Thu, 01 Jan 1970 00:00:00 GMT"
        );
        let t = UNIX_EPOCH + Duration::from_secs(784111777);
        assert_eq!(systemtime_to_httpdate(t), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn allow_lists() {
        assert_eq!(
            DavMethodSet::ALLOW_FILE.allow_string(),
            "PROPFIND,OPTIONS,DELETE,COPY,MOVE,HEAD,POST,PUT,GET"
        );
        assert_eq!(
            DavMethodSet::ALLOW_COLLECTION.allow_string(),
            "PROPFIND,OPTIONS,DELETE,COPY,MOVE"
        );
        assert_eq!(
            DavMethodSet::ALLOW_LOCKED.allow_string(),
            "PROPPATCH,PROPFIND,OPTIONS,DELETE,UNLOCK,COPY,LOCK,MOVE,HEAD,POST,PUT,GET"
        );
        assert_eq!(
            DavMethodSet::ALLOW_UNMAPPED.allow_string(),
            "OPTIONS,MKCOL,LOCK,POST,PUT"
        );
        assert_eq!(
            DavMethodSet::ALLOW_NOT_FOUND.allow_string(),
            "OPTIONS,MKCOL,POST,PUT"
        );
    }

    #[test]
    fn methods() {
        let propfind = http::Method::from_bytes(b"PROPFIND").unwrap();
        assert_eq!(dav_method(&propfind).unwrap(), DavMethod::PropFind);
        assert!(DavMethodSet::ALLOW_FILE.allows(DavMethod::Get));
        assert!(!DavMethodSet::ALLOW_COLLECTION.allows(DavMethod::Get));
        let bogus = http::Method::from_bytes(b"BREW").unwrap();
        assert!(dav_method(&bogus).is_err());
    }

    #[test]
    fn membuffer() {
        let mut b = MemBuffer::new();
        b.write_all(b"hello").unwrap();
        assert_eq!(&b.take()[..], b"hello");
        assert!(b.take().is_empty());
    }
}
