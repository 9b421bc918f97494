//! Local filesystem access.
//!
//! This implementation is stateless. So the easiest way to use it
//! is to create a new instance in your handler every time
//! you need one.

use std::io;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_stream::stream;
use bytes::Bytes;
use futures_util::{future, FutureExt, TryFutureExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::davpath::DavPath;
use crate::fs::*;

/// Local Filesystem implementation.
#[derive(Debug)]
pub struct LocalFs {
    basedir: PathBuf,
    public: bool,
}

#[derive(Debug)]
struct LocalFsFile(tokio::fs::File);

// Items from the readdir stream.
struct DirEntry {
    meta: io::Result<std::fs::Metadata>,
    entry: tokio::fs::DirEntry,
}

impl LocalFs {
    /// Create a new LocalFs DavFileSystem, serving "base".
    ///
    /// If "public" is set to true, all files and directories created will be
    /// publically readable (mode 644/755), otherwise they will be private
    /// (mode 600/700). Umask still overrides this.
    pub fn new(base: impl Into<PathBuf>, public: bool) -> Arc<LocalFs> {
        Arc::new(LocalFs {
            basedir: base.into(),
            public,
        })
    }

    fn abs_path(&self, path: &DavPath) -> PathBuf {
        let mut pathbuf = self.basedir.clone();
        pathbuf.push(path.as_rel_ospath());
        pathbuf
    }
}

// (used, total) bytes of the filesystem that holds `path`.
#[cfg(unix)]
fn statvfs(path: &Path) -> io::Result<(u64, u64)> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;

    let cpath = CString::new(path.as_os_str().as_bytes())?;
    let mut st = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: cpath is NUL terminated and st is a valid out-pointer.
    let r = unsafe { libc::statvfs(cpath.as_ptr(), st.as_mut_ptr()) };
    if r != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: statvfs returned success, so st is initialized.
    let st = unsafe { st.assume_init() };
    let bsize = st.f_frsize as u64;
    let total = st.f_blocks as u64 * bsize;
    let free = st.f_bfree as u64 * bsize;
    Ok((total.saturating_sub(free), total))
}

#[cfg(not(unix))]
fn statvfs(_path: &Path) -> io::Result<(u64, u64)> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "statvfs"))
}

// This implementation is basically a bunch of boilerplate to
// wrap the std::fs call in tokio::fs calls.
impl DavFileSystem for LocalFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        async move {
            let path = self.abs_path(path);
            let meta = tokio::fs::metadata(path).await?;
            Ok(Box::new(meta) as _)
        }
        .boxed()
    }

    fn read_dir<'a>(&'a self, davpath: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        async move {
            trace!("FS: read_dir {davpath:?}");
            let path = self.abs_path(davpath);
            let mut read_dir = tokio::fs::read_dir(&path).await?;
            Ok(Box::pin(stream! {
                loop {
                    match read_dir.next_entry().await {
                        Ok(Some(entry)) => {
                            let meta = entry.metadata().await;
                            yield Box::new(DirEntry { meta, entry }) as Box<dyn DavDirEntry>;
                        }
                        Ok(None) => break,
                        Err(e) => {
                            debug!("read_dir failed {e}");
                            break;
                        }
                    }
                }
            }) as _)
        }
        .boxed()
    }

    fn open<'a>(
        &'a self,
        path: &'a DavPath,
        options: OpenOptions,
    ) -> FsFuture<'a, Box<dyn DavFile>> {
        async move {
            trace!("FS: open {path:?} {options:?}");
            let path = self.abs_path(path);
            let mut opt = tokio::fs::OpenOptions::new();
            opt.read(options.read)
                .write(options.write)
                .append(options.append)
                .truncate(options.truncate)
                .create(options.create);
            #[cfg(unix)]
            if self.public {
                opt.mode(0o644);
            } else {
                opt.mode(0o600);
            }
            match opt.open(path).await {
                Ok(file) => Ok(Box::new(LocalFsFile(file)) as Box<dyn DavFile>),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: create_dir {path:?}");
            let path = self.abs_path(path);
            #[allow(unused_mut)]
            let mut dir = tokio::fs::DirBuilder::new();
            #[cfg(unix)]
            dir.mode(if self.public { 0o755 } else { 0o700 });
            Ok(dir.create(path).await?)
        }
        .boxed()
    }

    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: remove_dir {path:?}");
            if path.is_root() {
                return Err(FsError::Forbidden);
            }
            let path = self.abs_path(path);
            Ok(tokio::fs::remove_dir(path).await?)
        }
        .boxed()
    }

    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: remove_file {path:?}");
            let path = self.abs_path(path);
            Ok(tokio::fs::remove_file(path).await?)
        }
        .boxed()
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: rename {from:?} {to:?}");
            if from.is_root() || to.is_root() {
                return Err(FsError::Forbidden);
            }
            let p_from = self.abs_path(from);
            let p_to = self.abs_path(to);
            match tokio::fs::rename(&p_from, &p_to).await {
                Ok(v) => Ok(v),
                Err(e) => {
                    debug!("rename({from:?}, {to:?}) failed: {e}");
                    Err(e.into())
                }
            }
        }
        .boxed()
    }

    fn get_quota(&self) -> FsFuture<'_, (u64, u64)> {
        let path = self.basedir.clone();
        async move {
            match tokio::task::spawn_blocking(move || statvfs(&path)).await {
                Ok(Ok(q)) => Ok(q),
                Ok(Err(e)) if e.kind() == io::ErrorKind::Unsupported => Err(FsError::NotImplemented),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(FsError::GeneralFailure),
            }
        }
        .boxed()
    }
}

impl DavDirEntry for DirEntry {
    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let m = match &self.meta {
            Ok(meta) => Ok(Box::new(meta.clone()) as _),
            Err(e) => Err(e.into()),
        };
        Box::pin(future::ready(m))
    }

    #[cfg(unix)]
    fn name(&self) -> Vec<u8> {
        self.entry.file_name().as_bytes().to_vec()
    }

    #[cfg(not(unix))]
    fn name(&self) -> Vec<u8> {
        self.entry.file_name().to_string_lossy().as_bytes().to_vec()
    }
}

impl DavFile for LocalFsFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        async move {
            let meta = self.0.metadata().await?;
            Ok(Box::new(meta) as _)
        }
        .boxed()
    }

    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()> {
        async move { Ok(self.0.write_all(&buf).await?) }.boxed()
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        async move {
            let mut buf = vec![0u8; count];
            let n = self.0.read(&mut buf).await?;
            buf.truncate(n);
            Ok(Bytes::from(buf))
        }
        .boxed()
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        self.0.flush().map_err(Into::into).boxed()
    }
}

impl DavMetaData for std::fs::Metadata {
    fn len(&self) -> u64 {
        self.len()
    }
    fn modified(&self) -> FsResult<SystemTime> {
        self.modified().map_err(|e| e.into())
    }
    fn is_dir(&self) -> bool {
        self.is_dir()
    }
    fn is_file(&self) -> bool {
        self.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn p(s: &str) -> DavPath {
        DavPath::from_str_and_prefix(s, "").unwrap()
    }

    #[tokio::test]
    async fn roundtrip_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path(), false);

        fs.create_dir(&p("/docs")).await.unwrap();
        let mut f = fs.open(&p("/docs/a.txt"), OpenOptions::write()).await.unwrap();
        f.write_bytes(Bytes::from_static(b"0123456789")).await.unwrap();
        f.flush().await.unwrap();
        drop(f);

        let meta = fs.metadata(&p("/docs/a.txt")).await.unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.len(), 10);
        assert!(fs.metadata(&p("/docs")).await.unwrap().is_dir());

        let names: Vec<Vec<u8>> = fs
            .read_dir(&p("/docs"))
            .await
            .unwrap()
            .map(|e| e.name())
            .collect()
            .await;
        assert_eq!(names, vec![b"a.txt".to_vec()]);

        fs.rename(&p("/docs/a.txt"), &p("/b.txt")).await.unwrap();
        assert_eq!(
            fs.metadata(&p("/docs/a.txt")).await.unwrap_err(),
            FsError::NotFound
        );
        fs.remove_dir(&p("/docs")).await.unwrap();
        fs.remove_file(&p("/b.txt")).await.unwrap();
        assert_eq!(fs.remove_dir(&p("/")).await, Err(FsError::Forbidden));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn quota_from_statvfs() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path(), false);
        let (used, total) = fs.get_quota().await.unwrap();
        assert!(total > 0);
        assert!(used <= total);
    }
}
