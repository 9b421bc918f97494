//! ## Small async WebDAV handler
//!
//! [`Webdav`] (RFC4918) is HTTP (GET/HEAD/PUT/DELETE) plus a handful of
//! extension methods (PROPFIND, MKCOL, MOVE, LOCK, ...). This crate
//! implements just enough of it to mount a file store from the usual
//! WebDAV clients: Linux davfs2, macOS Finder, Windows explorer.
//!
//! A `handler` is a piece of code that takes a `http::Request`, processes it in some
//! way, and then generates a `http::Response`. This library is a `handler` that maps
//! the WebDAV protocol to "a" filesystem: the [`DavFileSystem`] trait. Included
//! are an adapter for the local filesystem ([`LocalFs`]) and an ephemeral
//! in-memory filesystem ([`MemFs`]).
//!
//! ## What is supported.
//!
//! - `PROPFIND` with `Depth: 0` and `Depth: 1`. `Depth: infinity` lists one
//!   level as well, unless [`DavBuilder::recurse_infinity`] is set.
//!   Properties are a fixed set: last modified, quota, resource type,
//!   and for files etag, length and content type.
//! - `PROPPATCH` answers like `PROPFIND`. Nothing is stored.
//! - `GET`, `HEAD`, `OPTIONS`, `PUT`, `DELETE`, `MKCOL`, `MOVE`.
//! - `LOCK` / `UNLOCK` always succeed and always hand out the same token.
//!   Nothing is locked, see the [`ls`] module.
//!
//! Anything else (`COPY`, `POST`, `PATCH`) gets a 404 with an `Allow` header.
//!
//! ## Example.
//!
//! Example server using [hyper] that serves the /tmp directory in r/w mode.
//!
//! ```no_run
//! use std::convert::Infallible;
//! use minidav::{DavHandler, FileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let dir = "/tmp";
//!     let addr = ([127, 0, 0, 1], 4918).into();
//!
//!     let dav_server = DavHandler::builder(FileSystem::local(dir, false))
//!         .strip_prefix("/dav")
//!         .build();
//!
//!     let make_service = hyper::service::make_service_fn(move |_| {
//!         let dav_server = dav_server.clone();
//!         async move {
//!             let func = move |req| {
//!                 let dav_server = dav_server.clone();
//!                 async move {
//!                     Ok::<_, Infallible>(dav_server.handle(req).await)
//!                 }
//!             };
//!             Ok::<_, Infallible>(hyper::service::service_fn(func))
//!         }
//!     });
//!
//!     println!("Serving {} on {}", dir, addr);
//!     let _ = hyper::Server::bind(&addr)
//!         .serve(make_service)
//!         .await
//!         .map_err(|e| eprintln!("server error: {}", e));
//! }
//! ```
//!
//! [`Webdav`]: https://tools.ietf.org/html/rfc4918
//! [hyper]: https://hyper.rs/
//! [`LocalFs`]: fs::localfs::LocalFs
//! [`MemFs`]: fs::memfs::MemFs

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod davhandler;
mod davheaders;
mod errors;
mod util;

pub mod body;
pub mod davpath;
pub mod etag;
pub mod fs;
pub mod ls;
pub mod quota;
pub mod resource;

#[cfg(any(docsrs, feature = "warp-compat"))]
#[cfg_attr(docsrs, doc(cfg(feature = "warp-compat")))]
pub mod warp;


use crate::errors::DavResult;

pub use crate::davhandler::{DavBuilder, DavHandler, FileSystem};
pub use crate::etag::{ETagHasher, Sha256ETag};
pub use crate::fs::DavFileSystem;
pub use crate::resource::ResourceType;
pub use crate::util::{systemtime_to_httpdate, DavMethod, DavMethodSet};
