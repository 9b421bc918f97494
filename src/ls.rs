//! Fake lock issuer.
//!
//! LOCK/UNLOCK always succeed and always hand out the same token.
//! Nothing is ever really locked: there is no owner, no expiry and
//! no conflict detection. This is just enough for clients that insist
//! on taking a LOCK before they PUT (macOS Finder, Windows explorer).
use std::io::Cursor;

use bytes::Bytes;
use uuid::{uuid, Uuid};
use xml::common::XmlVersion;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as XmlWEvent};
use xmltree::Element;

use crate::util::MemBuffer;
use crate::DavResult;

type Emitter = EventWriter<MemBuffer>;

const LOCK_UUID: Uuid = uuid!("26e57cb3-834d-191a-00de-000042bdecf9");

/// Lock timeout advertised in the discovery document, in seconds.
pub const LOCK_TIMEOUT_SECS: u32 = 3600;

lazy_static! {
    /// The one lock token, `urn:uuid:26e57cb3-...`.
    pub static ref LOCK_TOKEN: String = LOCK_UUID.urn().to_string();
}

/// Build the `lockdiscovery` document returned by LOCK.
///
/// `lockroot` is the URL of the locked resource; `owner` is echoed
/// back if the client sent one.
pub(crate) fn lock_discovery(lockroot: &str, owner: Option<&str>) -> DavResult<Bytes> {
    let mut emitter = EventWriter::new_with_config(
        MemBuffer::new(),
        EmitterConfig::new()
            .perform_indent(false)
            .normalize_empty_elements(true),
    );
    emitter.write(XmlWEvent::StartDocument {
        version: XmlVersion::Version10,
        encoding: Some("utf-8"),
        standalone: None,
    })?;
    emitter.write(XmlWEvent::start_element("D:prop").ns("D", "DAV:"))?;
    emitter.write(XmlWEvent::start_element("D:lockdiscovery"))?;
    emitter.write(XmlWEvent::start_element("D:activelock"))?;

    wrapped_elem(&mut emitter, "D:locktype", "write")?;
    wrapped_elem(&mut emitter, "D:lockscope", "exclusive")?;
    href_elem(&mut emitter, "D:locktoken", LOCK_TOKEN.as_str())?;
    href_elem(&mut emitter, "D:lockroot", lockroot)?;
    text_elem(&mut emitter, "D:depth", "infinity")?;
    if let Some(owner) = owner {
        emitter.write(XmlWEvent::start_element("D:owner"))?;
        emitter.write(XmlWEvent::start_element("a:href").ns("a", "DAV:"))?;
        emitter.write(XmlWEvent::characters(owner))?;
        emitter.write(XmlWEvent::end_element())?;
        emitter.write(XmlWEvent::end_element())?;
    }
    text_elem(&mut emitter, "D:timeout", &format!("Second-{LOCK_TIMEOUT_SECS}"))?;

    emitter.write(XmlWEvent::end_element())?; // activelock
    emitter.write(XmlWEvent::end_element())?; // lockdiscovery
    emitter.write(XmlWEvent::end_element())?; // prop
    Ok(emitter.inner_mut().take())
}

fn text_elem(emitter: &mut Emitter, name: &str, text: &str) -> DavResult<()> {
    emitter.write(XmlWEvent::start_element(name))?;
    emitter.write(XmlWEvent::characters(text))?;
    emitter.write(XmlWEvent::end_element())?;
    Ok(())
}

fn href_elem(emitter: &mut Emitter, name: &str, href: &str) -> DavResult<()> {
    emitter.write(XmlWEvent::start_element(name))?;
    text_elem(emitter, "D:href", href)?;
    emitter.write(XmlWEvent::end_element())?;
    Ok(())
}

// <D:locktype><write/></D:locktype> and friends.
fn wrapped_elem(emitter: &mut Emitter, name: &str, inner: &str) -> DavResult<()> {
    emitter.write(XmlWEvent::start_element(name))?;
    emitter.write(XmlWEvent::start_element(inner))?;
    emitter.write(XmlWEvent::end_element())?;
    emitter.write(XmlWEvent::end_element())?;
    Ok(())
}

/// Pull the owner out of a `<D:lockinfo>` request body.
///
/// The owner is either plain text or wrapped in an `<D:href>`.
/// Anything unparseable yields `None`; LOCK succeeds regardless.
pub(crate) fn lockinfo_owner(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let root = match Element::parse(Cursor::new(body)) {
        Ok(root) => root,
        Err(e) => {
            debug!("lock: ignoring unparseable body: {e}");
            return None;
        }
    };
    if root.name != "lockinfo" {
        return None;
    }
    let owner = root.get_child("owner")?;
    let text = match owner.get_child("href") {
        Some(href) => href.get_text(),
        None => owner.get_text(),
    }?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery(lockroot: &str, owner: Option<&str>) -> String {
        String::from_utf8(lock_discovery(lockroot, owner).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn constant_token() {
        assert_eq!(
            LOCK_TOKEN.as_str(),
            "urn:uuid:26e57cb3-834d-191a-00de-000042bdecf9"
        );
    }

    #[test]
    fn discovery_document() {
        let doc = discovery("http://host/dav/a.txt", None);
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(doc.contains(
            "<D:locktoken><D:href>urn:uuid:26e57cb3-834d-191a-00de-000042bdecf9</D:href></D:locktoken>"
        ));
        assert!(doc.contains("<D:lockroot><D:href>http://host/dav/a.txt</D:href></D:lockroot>"));
        assert!(doc.contains("<D:timeout>Second-3600</D:timeout>"));
        assert!(doc.contains("<D:locktype><write"));
        assert!(doc.contains("<D:lockscope><exclusive"));
        assert!(doc.contains("<D:depth>infinity</D:depth>"));
        assert!(!doc.contains("D:owner"));
        assert!(doc.ends_with("</D:activelock></D:lockdiscovery></D:prop>"));
        // always the same for the same resource.
        assert_eq!(doc, discovery("http://host/dav/a.txt", None));
    }

    #[test]
    fn owner_is_escaped() {
        let doc = discovery("/dav/a", Some("me & <you>"));
        assert!(doc.contains("<a:href xmlns:a=\"DAV:\">me &amp; &lt;you&gt;</a:href>"));
    }

    #[test]
    fn owner_from_body() {
        let body = br#"<?xml version="1.0" encoding="utf-8"?>
            <D:lockinfo xmlns:D="DAV:">
              <D:lockscope><D:exclusive/></D:lockscope>
              <D:locktype><D:write/></D:locktype>
              <D:owner><D:href>mailto:alice@example.com</D:href></D:owner>
            </D:lockinfo>"#;
        assert_eq!(
            lockinfo_owner(body).as_deref(),
            Some("mailto:alice@example.com")
        );

        let body = br#"<lockinfo xmlns="DAV:"><owner>bob</owner></lockinfo>"#;
        assert_eq!(lockinfo_owner(body).as_deref(), Some("bob"));

        assert_eq!(lockinfo_owner(b""), None);
        assert_eq!(lockinfo_owner(b"not xml"), None);
    }
}
