use headers::HeaderMapExt;
use http::{Request, Response};

use crate::body::Body;
use crate::davheaders::LockToken;
use crate::davpath::DavPath;
use crate::ls::{lock_discovery, lockinfo_owner, LOCK_TOKEN};
use crate::resource::ResourceType;
use crate::util::DavMethodSet;
use crate::DavResult;

use super::require_exists;

impl crate::DavHandler {
    pub(crate) fn handle_lock(
        &self,
        req: &Request<()>,
        path: &DavPath,
        rt: ResourceType,
        xmldata: &[u8],
    ) -> DavResult<Response<Body>> {
        require_exists(rt)?;

        let href = path.as_url_string();
        let lockroot = match req.headers().get(http::header::HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => format!("http://{host}{href}"),
            None => href,
        };
        let owner = lockinfo_owner(xmldata);
        debug!("LOCK {lockroot} owner {owner:?}");

        let mut res = Response::new(Body::from(lock_discovery(&lockroot, owner.as_deref())?));
        let h = res.headers_mut();
        h.insert(http::header::ALLOW, DavMethodSet::ALLOW_LOCKED.allow_header());
        h.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        h.typed_insert(LockToken(LOCK_TOKEN.clone()));
        Ok(res)
    }

    // Nothing was ever locked, so there is nothing to release.
    pub(crate) fn handle_unlock(&self, rt: ResourceType) -> DavResult<Response<Body>> {
        require_exists(rt)?;

        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.insert(http::header::ALLOW, DavMethodSet::ALLOW_LOCKED.allow_header());
        h.typed_insert(headers::ContentLength(0));
        h.typed_insert(LockToken(LOCK_TOKEN.clone()));
        Ok(res)
    }
}
