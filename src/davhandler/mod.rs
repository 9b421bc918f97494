//
// This module contains the main entry point of the library,
// DavHandler.
//
use std::error::Error as StdError;
use std::io;
#[cfg(any(docsrs, feature = "localfs"))]
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Buf;
use futures_util::stream::Stream;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::{Body, StreamBody};
use crate::errors::DavError;
use crate::etag::{ETagHasher, Sha256ETag};
use crate::fs::*;
use crate::resource::{resolve, ResourceType};
use crate::util::{dav_method, DavMethod, DavMethodSet};
use crate::DavResult;

pub mod handle_delete;
pub mod handle_gethead;
use handle_gethead::READ_BUF_SIZE;
pub mod handle_lock;
pub mod handle_mkcol;
pub mod handle_move;
pub mod handle_options;
pub mod handle_props;
pub mod handle_put;

// Request bodies we buffer (everything but PUT) are capped at this size.
const MAX_XML_BODY: usize = 65536;

/// Configuration of the handler.
#[derive(Clone)]
pub struct DavBuilder {
    /// Prefix to be stripped off when handling request.
    prefix: String,
    /// Filesystem backend.
    fs: FileSystem,
    /// Etag hash primitive.
    hasher: Arc<dyn ETagHasher>,
    /// Set of allowed methods (Defaults to "all methods")
    allow: DavMethodSet,
    /// read buffer size in bytes
    read_buf_size: usize,
    /// Does PROPFIND with `Depth: infinity` really recurse.
    recurse_infinity: bool,
}

/// File system backend.
#[derive(Clone)]
pub enum FileSystem {
    #[cfg(any(docsrs, feature = "memfs"))]
    Mem,
    #[cfg(any(docsrs, feature = "localfs"))]
    Local {
        /// Path to the root directory.
        base: PathBuf,
        public: bool,
    },
    /// Any other store.
    Custom(Arc<dyn DavFileSystem>),
}

impl FileSystem {
    /// Serve a local directory
    #[cfg(any(docsrs, feature = "localfs"))]
    pub fn local(path: impl Into<PathBuf>, public: bool) -> Self {
        FileSystem::Local {
            base: path.into(),
            public,
        }
    }

    fn build(self) -> Arc<dyn DavFileSystem> {
        match self {
            #[cfg(any(docsrs, feature = "memfs"))]
            FileSystem::Mem => crate::fs::memfs::MemFs::new(),
            #[cfg(any(docsrs, feature = "localfs"))]
            FileSystem::Local { base, public } => crate::fs::localfs::LocalFs::new(base, public),
            FileSystem::Custom(fs) => fs,
        }
    }
}

impl DavBuilder {
    /// Create a new configuration builder.
    pub fn new(fs: FileSystem) -> DavBuilder {
        Self {
            prefix: String::new(),
            fs,
            hasher: Arc::new(Sha256ETag),
            allow: DavMethodSet::WEBDAV_RW,
            read_buf_size: READ_BUF_SIZE,
            recurse_infinity: false,
        }
    }

    /// Use the configuration that was built to generate a DavHandler.
    pub fn build(self) -> DavHandler {
        self.into()
    }

    /// Prefix to be stripped off before translating the rest of
    /// the request path to a filesystem path.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        let mut this = self;
        this.prefix = prefix.into();
        this
    }

    /// Hash primitive for etags (default: SHA-256).
    pub fn hasher(self, hasher: impl ETagHasher + 'static) -> Self {
        let mut this = self;
        this.hasher = Arc::new(hasher);
        this
    }

    /// Which methods to allow (default is all methods).
    pub fn methods(self, allow: DavMethodSet) -> Self {
        let mut this = self;
        this.allow = allow;
        this
    }

    /// Read buffer size in bytes
    pub fn read_buf_size(self, size: usize) -> Self {
        let mut this = self;
        this.read_buf_size = size.max(1);
        this
    }

    /// Make PROPFIND with `Depth: infinity` list the whole subtree.
    ///
    /// Off by default: `infinity` then lists direct children only,
    /// exactly like `Depth: 1`.
    pub fn recurse_infinity(self, recurse: bool) -> Self {
        let mut this = self;
        this.recurse_infinity = recurse;
        this
    }
}

/// The webdav handler struct.
///
/// The `builder` method is used to instantiate a handler.
///
/// `handle` (or `handle_stream`, for stream bodies) does the actual work.
#[derive(Clone)]
pub struct DavHandler {
    pub(crate) prefix: Arc<String>,
    pub(crate) fs: Arc<dyn DavFileSystem>,
    pub(crate) hasher: Arc<dyn ETagHasher>,
    pub(crate) allow: DavMethodSet,
    pub(crate) read_buf_size: usize,
    pub(crate) recurse_infinity: bool,
}

impl From<DavBuilder> for DavHandler {
    fn from(cfg: DavBuilder) -> Self {
        Self {
            prefix: Arc::new(cfg.prefix),
            fs: cfg.fs.build(),
            hasher: cfg.hasher,
            allow: cfg.allow,
            read_buf_size: cfg.read_buf_size,
            recurse_infinity: cfg.recurse_infinity,
        }
    }
}

impl DavHandler {
    /// Return a configuration builder.
    pub fn builder(fs: FileSystem) -> DavBuilder {
        DavBuilder::new(fs)
    }

    /// Handle a webdav request.
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
    {
        self.handle_inner(req).await
    }

    /// Handles a request with a `Stream` body instead of a `HttpBody`.
    /// Used with webserver frameworks that have not
    /// opted to use the `http_body` crate just yet.
    #[doc(hidden)]
    pub async fn handle_stream<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: Stream<Item = Result<ReqData, ReqError>>,
    {
        let req = {
            let (parts, body) = req.into_parts();
            Request::from_parts(parts, StreamBody::new(body))
        };
        self.handle_inner(req).await
    }

    /// Handles a request with a `Stream` body instead of a `HttpBody`,
    /// replacing the configured prefix.
    #[doc(hidden)]
    pub async fn handle_stream_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: Stream<Item = Result<ReqData, ReqError>>,
    {
        let req = {
            let (parts, body) = req.into_parts();
            Request::from_parts(parts, StreamBody::new(body))
        };
        let mut this = self.clone();
        if let Some(prefix) = prefix {
            this.prefix = Arc::new(prefix);
        }
        this.handle_inner(req).await
    }
}

impl DavHandler {
    // drain request body and return it.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<Vec<u8>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut data = Vec::new();
        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::IoError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            while buf.has_remaining() {
                if data.len() + buf.remaining() > max_size {
                    return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
                }
                let b = buf.chunk();
                let l = b.len();
                data.extend_from_slice(b);
                buf.advance(l);
            }
        }
        Ok(data)
    }

    // internal dispatcher.
    async fn handle_inner<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        // Turn any DavError results into a HTTP error response.
        match self.handle2(req).await {
            Ok(resp) => {
                debug!("== END REQUEST result {}", resp.status());
                resp
            }
            Err(err) => {
                debug!("== END REQUEST result {:?}", err);
                let status = err.statuscode();
                let mut resp = Response::new(Body::empty());
                *resp.status_mut() = status;
                let h = resp.headers_mut();
                h.insert(http::header::CONTENT_LENGTH, http::HeaderValue::from_static("0"));
                if status == StatusCode::NOT_FOUND {
                    h.insert(http::header::ALLOW, DavMethodSet::ALLOW_NOT_FOUND.allow_header());
                }
                if err.must_close() {
                    h.insert(http::header::CONNECTION, http::HeaderValue::from_static("close"));
                }
                resp
            }
        }
    }

    // internal dispatcher part 2.
    async fn handle2<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        // translate HTTP method to Webdav method.
        let method = match dav_method(req.method()) {
            Ok(m) => m,
            Err(e) => {
                debug!("refusing method {} request {}", req.method(), req.uri());
                return Err(e);
            }
        };

        // see if method is allowed.
        if !self.allow.allows(method) {
            debug!(
                "method {} not allowed on request {}",
                req.method(),
                req.uri()
            );
            return Err(DavError::StatusClose(StatusCode::METHOD_NOT_ALLOWED));
        }

        // normalize the path and see what the store has there.
        let (path, rt) = resolve(&*self.fs, req.uri(), &self.prefix).await?;

        debug!("== START REQUEST {:?} {} ({:?})", method, path, rt);

        // PUT streams the body chunk by chunk. LOCK is the only other
        // method that looks at it, and only to find the owner; the
        // rest never read it.
        if method == DavMethod::Put {
            return self.handle_put(&req, &path, rt, body).await;
        }
        let body_data = if method == DavMethod::Lock {
            match self.read_request(body, MAX_XML_BODY).await {
                Ok(data) => data,
                Err(e) => {
                    debug!("LOCK {}: ignoring request body: {}", path, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        match method {
            DavMethod::PropFind | DavMethod::PropPatch => {
                self.handle_propfind(&req, &path, rt).await
            }
            DavMethod::Get => self.handle_get(&path, rt).await,
            DavMethod::Head | DavMethod::Options => {
                self.handle_options(method, &path, rt).await
            }
            DavMethod::Lock => self.handle_lock(&req, &path, rt, &body_data),
            DavMethod::Unlock => self.handle_unlock(rt),
            DavMethod::MkCol => self.handle_mkcol(&path, rt).await,
            DavMethod::Move => self.handle_move(&req, &path, rt).await,
            DavMethod::Delete => self.handle_delete(&path, rt).await,
            DavMethod::Copy | DavMethod::Post | DavMethod::Patch | DavMethod::Put => {
                Err(StatusCode::NOT_FOUND.into())
            }
        }
    }
}

// Shared by the handlers: everything needs the resource to exist.
pub(crate) fn require_exists(rt: ResourceType) -> DavResult<()> {
    if rt.exists() {
        Ok(())
    } else {
        Err(StatusCode::NOT_FOUND.into())
    }
}
