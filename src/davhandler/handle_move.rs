use bytes::Bytes;
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davheaders::Destination;
use crate::davpath::DavPath;
use crate::resource::ResourceType;
use crate::util::DavMethodSet;
use crate::DavResult;

use super::require_exists;

impl crate::DavHandler {
    pub(crate) async fn handle_move(
        &self,
        req: &Request<()>,
        path: &DavPath,
        rt: ResourceType,
    ) -> DavResult<Response<Body>> {
        require_exists(rt)?;

        // A missing or unusable Destination is just another 404.
        let dest = match req.headers().typed_get::<Destination>() {
            Some(dest) => DavPath::from_destination(&dest.0, &self.prefix)?,
            None => return Err(StatusCode::NOT_FOUND.into()),
        };
        debug!("MOVE {path:?} -> {dest:?}");

        if let Err(e) = self.fs.rename(path, &dest).await {
            debug!("MOVE {path:?} -> {dest:?} failed: {e}");
            let mut res = Response::new(Body::from(Bytes::from_static(b"Unable to move")));
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            res.headers_mut()
                .typed_insert(headers::ContentType::text());
            return Ok(res);
        }

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::CREATED;
        let h = res.headers_mut();
        h.insert(http::header::ALLOW, DavMethodSet::ALLOW_UNMAPPED.allow_header());
        h.typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
