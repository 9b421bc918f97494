use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::resource::ResourceType;
use crate::util::DavMethodSet;
use crate::DavResult;

impl crate::DavHandler {
    // Collections are removed non-recursively, so a non-empty one fails.
    //
    // Status codes are 200 on success and 201 on failure.
    pub(crate) async fn handle_delete(
        &self,
        path: &DavPath,
        rt: ResourceType,
    ) -> DavResult<Response<Body>> {
        let result = match rt {
            ResourceType::None => return Err(StatusCode::NOT_FOUND.into()),
            ResourceType::File => self.fs.remove_file(path).await,
            ResourceType::Directory => self.fs.remove_dir(path).await,
        };

        let mut res = Response::new(Body::empty());
        match result {
            Ok(()) => {
                *res.status_mut() = StatusCode::OK;
                res.headers_mut()
                    .insert(http::header::ALLOW, DavMethodSet::ALLOW_UNMAPPED.allow_header());
            }
            Err(e) => {
                debug!("DELETE {path:?} failed: {e}");
                *res.status_mut() = StatusCode::CREATED;
            }
        }
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
