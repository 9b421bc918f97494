use futures_util::future::{BoxFuture, FutureExt};
use futures_util::StreamExt;
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};
use xml::common::XmlVersion;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as XmlWEvent};

use crate::body::Body;
use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::etag::{file_etag, ETagHasher};
use crate::fs::*;
use crate::quota::{quota, Quota};
use crate::resource::ResourceType;
use crate::util::{systemtime_to_httpdate, MemBuffer};
use crate::DavResult;

const NS_DAV_URI: &str = "DAV:";
// Every resource is reported as generic text.
const FILE_CONTENT_TYPE: &str = "text/plain";

type Emitter = EventWriter<MemBuffer>;

// Renders the multistatus document, one <d:response> at a time.
pub(crate) struct PropWriter<'h> {
    emitter: Emitter,
    hasher: &'h dyn ETagHasher,
    quota: Quota,
}

impl crate::DavHandler {
    pub(crate) async fn handle_propfind(
        &self,
        req: &Request<()>,
        path: &DavPath,
        rt: ResourceType,
    ) -> DavResult<Response<Body>> {
        if !rt.exists() {
            return Err(StatusCode::NOT_FOUND.into());
        }
        let depth = req.headers().typed_get::<Depth>().unwrap_or_default();
        debug!("propfind: {path:?} depth {depth:?}");

        // One quota answer is shared by every entry in the document.
        let quota = quota(&*self.fs).await;
        let meta = self.fs.metadata(path).await?;

        let mut pw = PropWriter::new(&*self.hasher, quota)?;
        pw.write_props(path, &*meta)?;

        if meta.is_dir() && depth.wants_children() {
            let recurse = self.recurse_infinity && depth == Depth::Infinity;
            self.propfind_directory(path, recurse, &mut pw).await?;
        }

        let mut res = Response::new(Body::from(pw.close()?));
        *res.status_mut() = StatusCode::MULTI_STATUS;
        res.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        Ok(res)
    }

    // Lists the direct members of a collection, or the whole subtree
    // when `recurse` is set. Boxed because it calls itself.
    fn propfind_directory<'a>(
        &'a self,
        path: &'a DavPath,
        recurse: bool,
        pw: &'a mut PropWriter<'_>,
    ) -> BoxFuture<'a, DavResult<()>> {
        async move {
            let mut entries = match self.fs.read_dir(path).await {
                Ok(entries) => entries,
                Err(e) => {
                    // if we cannot read_dir, just skip it.
                    debug!("read_dir error {e:?}");
                    return Ok(());
                }
            };

            while let Some(dirent) = entries.next().await {
                let mut npath = path.clone();
                npath.push_segment(&dirent.name());
                let meta = match dirent.metadata().await {
                    Ok(meta) => meta,
                    Err(e) => {
                        debug!("metadata error on {npath:?}. Skipping {e:?}");
                        continue;
                    }
                };
                pw.write_props(&npath, &*meta)?;
                if recurse && meta.is_dir() {
                    self.propfind_directory(&npath, recurse, pw).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }
}

impl<'h> PropWriter<'h> {
    pub fn new(hasher: &'h dyn ETagHasher, quota: Quota) -> DavResult<PropWriter<'h>> {
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
        emitter.write(XmlWEvent::start_element("d:multistatus").ns("d", NS_DAV_URI))?;

        Ok(PropWriter {
            emitter,
            hasher,
            quota,
        })
    }

    fn text_elem(&mut self, name: &str, text: &str) -> DavResult<()> {
        self.emitter.write(XmlWEvent::start_element(name))?;
        self.emitter.write(XmlWEvent::characters(text))?;
        self.emitter.write(XmlWEvent::end_element())?;
        Ok(())
    }

    fn empty_elem(&mut self, name: &str) -> DavResult<()> {
        self.emitter.write(XmlWEvent::start_element(name))?;
        self.emitter.write(XmlWEvent::end_element())?;
        Ok(())
    }

    /// Write one `<d:response>` for `path`.
    pub fn write_props(&mut self, path: &DavPath, meta: &dyn DavMetaData) -> DavResult<()> {
        let is_dir = meta.is_dir();
        let href = if is_dir {
            path.as_collection_url_string()
        } else {
            path.as_url_string()
        };
        let lastmodified = meta
            .modified()
            .map(systemtime_to_httpdate)
            .unwrap_or_default();

        self.emitter.write(XmlWEvent::start_element("d:response"))?;
        self.text_elem("d:href", &href)?;
        self.emitter.write(XmlWEvent::start_element("d:propstat"))?;
        self.emitter.write(XmlWEvent::start_element("d:prop"))?;

        self.text_elem("d:getlastmodified", &lastmodified)?;
        self.text_elem("d:quota-used-bytes", &self.quota.used.to_string())?;
        self.text_elem("d:quota-available-bytes", &self.quota.available.to_string())?;

        if is_dir {
            self.emitter.write(XmlWEvent::start_element("d:resourcetype"))?;
            self.empty_elem("d:collection")?;
            self.emitter.write(XmlWEvent::end_element())?;
        } else {
            let etag = file_etag(self.hasher, &href, &lastmodified);
            self.text_elem("d:getetag", &etag)?;
            self.empty_elem("d:resourcetype")?;
            self.text_elem("d:getcontentlength", &meta.len().to_string())?;
            self.text_elem("d:getcontenttype", FILE_CONTENT_TYPE)?;
        }

        self.emitter.write(XmlWEvent::end_element())?; // prop
        self.text_elem("d:status", "HTTP/1.1 200 OK")?;
        self.emitter.write(XmlWEvent::end_element())?; // propstat
        self.emitter.write(XmlWEvent::end_element())?; // response
        Ok(())
    }

    /// Close the document and return it.
    pub fn close(mut self) -> DavResult<bytes::Bytes> {
        self.emitter.write(XmlWEvent::end_element())?; // multistatus
        Ok(self.emitter.inner_mut().take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etag::Sha256ETag;
    use std::time::{Duration, UNIX_EPOCH};

    #[derive(Debug)]
    struct Meta {
        dir: bool,
        len: u64,
    }

    impl DavMetaData for Meta {
        fn len(&self) -> u64 {
            self.len
        }
        fn modified(&self) -> FsResult<std::time::SystemTime> {
            Ok(UNIX_EPOCH + Duration::from_secs(784111777))
        }
        fn is_dir(&self) -> bool {
            self.dir
        }
    }

    fn render(entries: &[(&str, Meta)]) -> String {
        let quota = Quota {
            used: 5,
            available: 95,
        };
        let mut pw = PropWriter::new(&Sha256ETag, quota).unwrap();
        for (p, meta) in entries {
            let path = DavPath::from_str_and_prefix(p, "/dav").unwrap();
            pw.write_props(&path, meta).unwrap();
        }
        String::from_utf8(pw.close().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn collection_entry() {
        let doc = render(&[("/dav/docs", Meta { dir: true, len: 0 })]);
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(doc.contains("<d:multistatus xmlns:d=\"DAV:\">"));
        assert!(doc.contains("<d:href>/dav/docs/</d:href>"));
        assert!(doc.contains("<d:collection"));
        assert!(doc.contains("<d:getlastmodified>Sun, 06 Nov 1994 08:49:37 GMT</d:getlastmodified>"));
        assert!(doc.contains("<d:quota-used-bytes>5</d:quota-used-bytes>"));
        assert!(doc.contains("<d:quota-available-bytes>95</d:quota-available-bytes>"));
        assert!(!doc.contains("getetag"));
        assert!(!doc.contains("getcontentlength"));
        assert!(doc.contains("<d:status>HTTP/1.1 200 OK</d:status>"));
        assert!(doc.ends_with("</d:multistatus>"));
    }

    #[test]
    fn file_entry() {
        let doc = render(&[("/dav/my file.txt", Meta { dir: false, len: 10 })]);
        assert!(doc.contains("<d:href>/dav/my%20file.txt</d:href>"));
        assert!(doc.contains("<d:getcontentlength>10</d:getcontentlength>"));
        assert!(doc.contains("<d:getcontenttype>text/plain</d:getcontenttype>"));
        let etag = Sha256ETag.etag("/dav/my%20file.txtSun, 06 Nov 1994 08:49:37 GMT");
        assert!(doc.contains(&format!("<d:getetag>{etag}</d:getetag>")));
        assert!(!doc.contains("<d:collection"));
    }

    #[test]
    fn one_response_per_entry() {
        let doc = render(&[
            ("/dav/docs", Meta { dir: true, len: 0 }),
            ("/dav/docs/a.txt", Meta { dir: false, len: 10 }),
        ]);
        assert_eq!(doc.matches("<d:response>").count(), 2);
    }
}
