//! Adapter for the `warp` HTTP server framework.
//!
//! The filters in this module will always succeed and never
//! return an error. For example, if a file is not found, the
//! filter will return a 404 reply, and not an internal
//! rejection.
//!
use std::convert::Infallible;
#[cfg(feature = "localfs")]
use std::path::Path;

use crate::DavHandler;
#[cfg(feature = "localfs")]
use crate::FileSystem;
use warp::{filters::BoxedFilter, Filter, Reply};

/// Reply-filter that runs a DavHandler.
///
/// The mount prefix is the request path up to this point, whatever
/// the handler was configured with.
pub fn dav_handler(handler: DavHandler) -> BoxedFilter<(impl Reply,)> {
    use http::header::HeaderMap;
    use http::Response;
    use warp::path::{FullPath, Tail};

    warp::method()
        .and(warp::path::full())
        .and(warp::path::tail())
        .and(warp::header::headers_cloned())
        .and(warp::body::stream())
        .and_then(
            move |method, path_full: FullPath, path_tail: Tail, headers: HeaderMap, body| {
                let handler = handler.clone();

                async move {
                    let path_str = path_full.as_str();
                    let path_len = path_str.len();
                    let tail_len = path_tail.as_str().len();
                    let prefix = path_str[..path_len - tail_len].to_string();

                    // rebuild an http::Request struct.
                    let mut builder = http::Request::builder().method(method).uri(path_str);
                    for (k, v) in headers.iter() {
                        builder = builder.header(k, v);
                    }
                    let response = match builder.body(body) {
                        Ok(request) => {
                            let response = handler
                                .handle_stream_with(request, Some(prefix))
                                .await;
                            // Need to remap the http_body::Body to a hyper::Body.
                            let (parts, body) = response.into_parts();
                            Response::from_parts(parts, hyper::Body::wrap_stream(body))
                        }
                        Err(e) => {
                            debug!("warp: cannot rebuild request for {path_str}: {e}");
                            let mut response = Response::new(hyper::Body::empty());
                            *response.status_mut() = http::StatusCode::BAD_REQUEST;
                            response
                        }
                    };
                    Ok::<_, Infallible>(response)
                }
            },
        )
        .boxed()
}

/// Creates a Filter that serves files and directories at the
/// base path joined with the remainder of the request path,
/// like `warp::filters::fs::dir`.
#[cfg(feature = "localfs")]
pub fn dav_dir(base: impl AsRef<Path>) -> BoxedFilter<(impl Reply,)> {
    dav_handler(DavHandler::builder(FileSystem::local(base.as_ref(), false)).build())
}
