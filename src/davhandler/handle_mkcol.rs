use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::resource::ResourceType;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_mkcol(
        &self,
        path: &DavPath,
        rt: ResourceType,
    ) -> DavResult<Response<Body>> {
        if rt.exists() {
            debug!("MKCOL {path:?}: already exists");
            return Err(StatusCode::METHOD_NOT_ALLOWED.into());
        }
        if let Err(e) = self.fs.create_dir(path).await {
            debug!("MKCOL {path:?}: {e}");
            return Err(StatusCode::METHOD_NOT_ALLOWED.into());
        }

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::CREATED;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
