//! Contains the structs and traits that define a filesystem backend.
//!
//! You only need this if you are going to implement your own
//! store. The handler talks to the store exclusively through
//! [`DavFileSystem`], so any hierarchical store that can list,
//! stat, read, write, rename and remove entries can be served.
use std::fmt::Debug;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::{future::BoxFuture, stream::BoxStream, FutureExt};

use crate::davpath::DavPath;

#[cfg(any(docsrs, feature = "localfs"))]
#[cfg_attr(docsrs, doc(cfg(feature = "localfs")))]
pub mod localfs;
#[cfg(any(docsrs, feature = "memfs"))]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub mod memfs;

macro_rules! notimplemented_fut {
    ($method:expr) => {
        async move { Err(FsError::NotImplemented) }.boxed()
    };
}

/// Errors generated by a filesystem implementation.
///
/// These are more result-codes than errors, really.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Operation not implemented (501)
    NotImplemented,
    /// Something went wrong (500)
    GeneralFailure,
    /// tried to create something, but it existed (405)
    Exists,
    /// File / Directory not found (404)
    NotFound,
    /// Not allowed (403)
    Forbidden,
}

impl std::error::Error for FsError {}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&std::io::Error> for FsError {
    fn from(e: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => FsError::NotFound,
            ErrorKind::PermissionDenied => FsError::Forbidden,
            ErrorKind::AlreadyExists => FsError::Exists,
            _ => FsError::GeneralFailure,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(e: std::io::Error) -> Self {
        (&e).into()
    }
}

/// The Result type.
pub type FsResult<T> = std::result::Result<T, FsError>;

/// A webdav "filesystem" future.
pub type FsFuture<'a, T> = BoxFuture<'a, FsResult<T>>;

/// Stream of directory entries returned by `read_dir`.
pub type FsStream<T> = BoxStream<'static, T>;

/// The trait that defines a filesystem.
///
/// Paths are always [`DavPath`]s: relative to the mount, normalized,
/// and without a trailing slash (except the root).
pub trait DavFileSystem: Sync + Send {
    /// Open a file.
    fn open<'a>(&'a self, path: &'a DavPath, options: OpenOptions)
        -> FsFuture<'a, Box<dyn DavFile>>;

    /// List the direct children of a directory.
    fn read_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>>;

    /// Return the metadata of a file or directory.
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>>;

    /// Create a directory. The parent must exist.
    #[allow(unused_variables)]
    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        notimplemented_fut!("create_dir")
    }

    /// Remove an empty directory.
    #[allow(unused_variables)]
    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        notimplemented_fut!("remove_dir")
    }

    /// Remove a file.
    #[allow(unused_variables)]
    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        notimplemented_fut!("remove_file")
    }

    /// Rename a file or directory.
    #[allow(unused_variables)]
    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        notimplemented_fut!("rename")
    }

    /// Get space usage: `(used, total)` in bytes.
    ///
    /// Stores without capacity information keep the default, and the
    /// handler then reports zero for both values.
    fn get_quota(&self) -> FsFuture<'_, (u64, u64)> {
        notimplemented_fut!("get_quota")
    }
}

/// One directory entry (or child node).
pub trait DavDirEntry: Send + Sync {
    /// Name of the entry.
    fn name(&self) -> Vec<u8>;

    /// Metadata of the entry.
    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>>;
}

/// A `DavFile` is the equivalent of `std::fs::File`.
///
/// Dropping it closes the underlying handle.
pub trait DavFile: Debug + Send + Sync {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>>;
    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()>;
    /// Read up to `count` bytes. An empty result means end-of-file.
    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes>;
    fn flush(&mut self) -> FsFuture<'_, ()>;
}

/// File metadata. Basically type, length, and modification time.
pub trait DavMetaData: Debug + Send + Sync {
    /// Size of the file.
    fn len(&self) -> u64;
    /// `Modified` timestamp.
    fn modified(&self) -> FsResult<SystemTime>;
    /// File or directory (aka collection).
    fn is_dir(&self) -> bool;

    /// Is this a file and not a directory. Default: `!is_dir()`.
    fn is_file(&self) -> bool {
        !self.is_dir()
    }
}

/// OpenOptions for `open()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// open for reading
    pub read: bool,
    /// open for writing
    pub write: bool,
    /// open in write-append mode
    pub append: bool,
    /// truncate file first when writing
    pub truncate: bool,
    /// create file if it doesn't exist
    pub create: bool,
}

impl OpenOptions {
    /// Open an existing file for reading.
    pub fn read() -> OpenOptions {
        OpenOptions {
            read: true,
            ..Default::default()
        }
    }

    /// Create a file, or truncate an existing one.
    pub fn write() -> OpenOptions {
        OpenOptions {
            write: true,
            truncate: true,
            create: true,
            ..Default::default()
        }
    }

    /// Append to a file, creating it if needed.
    pub fn append() -> OpenOptions {
        OpenOptions {
            write: true,
            append: true,
            create: true,
            ..Default::default()
        }
    }
}
