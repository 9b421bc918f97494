use std::convert::TryFrom;

use headers::Header;
use http::header::{HeaderName, HeaderValue};

lazy_static! {
    static ref DEPTH: HeaderName = HeaderName::from_static("depth");
    static ref DESTINATION: HeaderName = HeaderName::from_static("destination");
    static ref LOCK_TOKEN: HeaderName = HeaderName::from_static("lock-token");
    static ref DAV: HeaderName = HeaderName::from_static("dav");
}

fn one<'i, I>(values: &mut I) -> Result<&'i HeaderValue, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let v = values.next().ok_or_else(invalid)?;
    if values.next().is_some() {
        return Err(invalid());
    }
    Ok(v)
}

fn invalid() -> headers::Error {
    headers::Error::invalid()
}

fn map_invalid(_e: impl std::error::Error) -> headers::Error {
    headers::Error::invalid()
}

/// Depth: header.
///
/// Only `1` and `infinity` mean anything to the handler. Everything
/// else, including `0`, describes just the resource itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Depth {
    #[default]
    None,
    ChildrenOnly,
    Infinity,
}

impl Depth {
    /// Does this depth ask for collection members.
    pub fn wants_children(self) -> bool {
        self != Depth::None
    }
}

impl Header for Depth {
    fn name() -> &'static HeaderName {
        &DEPTH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = one(values)?;
        let depth = match value.as_bytes() {
            b"1" => Depth::ChildrenOnly,
            v if v.eq_ignore_ascii_case(b"infinity") => Depth::Infinity,
            _ => Depth::None,
        };
        Ok(depth)
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = match *self {
            Depth::None => "0",
            Depth::ChildrenOnly => "1",
            Depth::Infinity => "infinity",
        };
        values.extend(std::iter::once(HeaderValue::from_static(value)));
    }
}

/// Destination: header. Absolute URL or path; resolved by `DavPath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination(pub String);

impl Header for Destination {
    fn name() -> &'static HeaderName {
        &DESTINATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?.to_str().map_err(map_invalid)?.trim();
        if s.is_empty() {
            return Err(invalid());
        }
        Ok(Destination(s.to_string()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            values.extend(std::iter::once(value));
        }
    }
}

/// Lock-Token: header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(pub String);

impl Header for LockToken {
    fn name() -> &'static HeaderName {
        &LOCK_TOKEN
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?.to_str().map_err(map_invalid)?;
        let s = s.trim().trim_start_matches('<').trim_end_matches('>');
        Ok(LockToken(s.to_string()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Ok(value) = HeaderValue::try_from(self.0.as_str()) {
            values.extend(std::iter::once(value));
        }
    }
}

/// DAV: header, sent with OPTIONS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dav(pub &'static str);

impl Header for Dav {
    fn name() -> &'static HeaderName {
        &DAV
    }

    fn decode<'i, I>(_values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        Err(invalid())
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        values.extend(std::iter::once(HeaderValue::from_static(self.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use headers::HeaderMapExt;
    use http::HeaderMap;

    fn depth(v: Option<&'static str>) -> Depth {
        let mut map = HeaderMap::new();
        if let Some(v) = v {
            map.insert("depth", HeaderValue::from_static(v));
        }
        map.typed_get::<Depth>().unwrap_or_default()
    }

    #[test]
    fn depth_values() {
        assert_eq!(depth(None), Depth::None);
        assert_eq!(depth(Some("0")), Depth::None);
        assert_eq!(depth(Some("1")), Depth::ChildrenOnly);
        assert_eq!(depth(Some("infinity")), Depth::Infinity);
        assert_eq!(depth(Some("Infinity")), Depth::Infinity);
        assert_eq!(depth(Some("2")), Depth::None);
    }

    #[test]
    fn destination() {
        let mut map = HeaderMap::new();
        map.insert("destination", HeaderValue::from_static(" "));
        assert!(map.typed_get::<Destination>().is_none());
        map.insert("destination", HeaderValue::from_static("http://h/dav/b.txt"));
        assert_eq!(
            map.typed_get::<Destination>(),
            Some(Destination("http://h/dav/b.txt".to_string()))
        );
    }
}
