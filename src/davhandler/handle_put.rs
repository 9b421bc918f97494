use std::error::Error as StdError;

use bytes::{Buf, Bytes};
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::davpath::DavPath;
use crate::fs::*;
use crate::resource::ResourceType;
use crate::DavResult;

impl crate::DavHandler {
    /// Write one chunk of a PUT body.
    ///
    /// Chunks must arrive in order, without gaps. The chunk at offset 0
    /// (re)creates the file, every later chunk is appended. The file is
    /// closed again before returning; nothing is kept between chunks and
    /// `total` is informational only.
    pub(crate) async fn put_chunk(
        &self,
        path: &DavPath,
        data: Bytes,
        offset: u64,
        total: Option<u64>,
    ) -> FsResult<()> {
        trace!(
            "PUT chunk {path:?} offset {offset} len {} total {total:?}",
            data.len()
        );
        let oo = if offset == 0 {
            OpenOptions::write()
        } else {
            OpenOptions::append()
        };
        let mut file = self.fs.open(path, oo).await?;
        file.write_bytes(data).await?;
        file.flush().await
    }

    pub(crate) async fn handle_put<ReqBody, ReqData, ReqError>(
        &self,
        req: &Request<()>,
        path: &DavPath,
        rt: ResourceType,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        // Decided before any byte is written: the first chunk
        // creates the file.
        let status = match rt {
            ResourceType::Directory => return Err(StatusCode::NOT_FOUND.into()),
            ResourceType::File => StatusCode::OK,
            ResourceType::None => StatusCode::CREATED,
        };
        let total = req
            .headers()
            .typed_get::<headers::ContentLength>()
            .map(|l| l.0);

        let mut offset = 0u64;
        pin_utils::pin_mut!(body);
        while let Some(chunk) = body.data().await {
            let mut buf = match chunk {
                Ok(buf) => buf,
                Err(e) => {
                    // A dropped upload leaves whatever was written so far.
                    debug!("PUT {path:?}: body error at offset {offset}: {e}");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR.into());
                }
            };
            let data = buf.copy_to_bytes(buf.remaining());
            if data.is_empty() {
                continue;
            }
            let len = data.len() as u64;
            if let Err(e) = self.put_chunk(path, data, offset, total).await {
                warn!("PUT {path:?}: write failed at offset {offset}: {e}");
                return Err(StatusCode::INTERNAL_SERVER_ERROR.into());
            }
            offset += len;
        }

        // An empty body still leaves an empty file behind.
        if offset == 0 {
            if let Err(e) = self.put_chunk(path, Bytes::new(), 0, total).await {
                warn!("PUT {path:?}: create failed: {e}");
                return Err(StatusCode::INTERNAL_SERVER_ERROR.into());
            }
        }

        let mut res = Response::new(Body::empty());
        *res.status_mut() = status;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
