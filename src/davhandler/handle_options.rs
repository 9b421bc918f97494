use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;
use crate::davheaders::Dav;
use crate::davpath::DavPath;
use crate::resource::ResourceType;
use crate::util::{DavMethod, DavMethodSet};
use crate::DavResult;

impl crate::DavHandler {
    // HEAD and OPTIONS report what can be done with the resource.
    // HEAD on a file also describes it the way GET would.
    pub(crate) async fn handle_options(
        &self,
        method: DavMethod,
        path: &DavPath,
        rt: ResourceType,
    ) -> DavResult<Response<Body>> {
        let allow = match rt {
            ResourceType::None => return Err(StatusCode::NOT_FOUND.into()),
            ResourceType::File => DavMethodSet::ALLOW_FILE,
            ResourceType::Directory => DavMethodSet::ALLOW_COLLECTION,
        };

        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.insert(http::header::ALLOW, allow.allow_header());

        if method == DavMethod::Head && rt == ResourceType::File {
            let meta = match self.fs.metadata(path).await {
                Ok(meta) => meta,
                Err(e) => {
                    debug!("HEAD {path}: metadata failed: {e:?}");
                    return Err(StatusCode::NOT_FOUND.into());
                }
            };
            h.typed_insert(headers::ContentLength(meta.len()));
            h.typed_insert(headers::ContentType::from(
                mime_guess::from_path(path.file_name()).first_or_octet_stream(),
            ));
            if let Ok(modified) = meta.modified() {
                h.typed_insert(headers::LastModified::from(modified));
            }
            return Ok(res);
        }
        h.typed_insert(headers::ContentLength(0));

        // Level 2 is advertised since LOCK/UNLOCK always "succeed".
        if method == DavMethod::Options {
            h.typed_insert(Dav("1,2"));
            h.insert("MS-Author-Via", http::HeaderValue::from_static("DAV"));
        }

        Ok(res)
    }
}
