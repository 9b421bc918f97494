use async_stream::stream;
use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::fs::*;
use crate::resource::ResourceType;
use crate::util::DavMethodSet;
use crate::DavResult;

/// Default chunk size for streaming GET bodies.
pub(crate) const READ_BUF_SIZE: usize = 16384;

impl crate::DavHandler {
    pub(crate) async fn handle_get(
        &self,
        path: &DavPath,
        rt: ResourceType,
    ) -> DavResult<Response<Body>> {
        if rt != ResourceType::File {
            return Err(StatusCode::NOT_FOUND.into());
        }

        let mut file = self.fs.open(path, OpenOptions::read()).await?;
        let meta = file.metadata().await?;
        let len = meta.len();

        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.insert(http::header::ALLOW, DavMethodSet::ALLOW_FILE.allow_header());
        h.typed_insert(headers::ContentLength(len));
        h.typed_insert(headers::ContentType::from(
            mime_guess::from_path(path.file_name()).first_or_octet_stream(),
        ));
        if let Ok(modified) = meta.modified() {
            h.typed_insert(headers::LastModified::from(modified));
        }

        // The stream owns the file; it is closed when the body
        // is done or dropped.
        let read_buf_size = self.read_buf_size;
        *res.body_mut() = Body::stream(stream! {
            let mut todo = len;
            while todo > 0 {
                let data = match file.read_bytes(read_buf_size).await {
                    Ok(data) => data,
                    Err(e) => {
                        debug!("GET: read failed: {e}");
                        yield Err(std::io::Error::from(e));
                        break;
                    }
                };
                if data.is_empty() {
                    break;
                }
                todo = todo.saturating_sub(data.len() as u64);
                yield Ok(data);
            }
        });

        Ok(res)
    }
}
