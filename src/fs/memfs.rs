//! Simple in-memory filesystem.
//!
//! This implementation has state, so if you create a
//! new instance in a handler(), it will be empty every time.
//!
//! This means you have to create the instance once, using `MemFs::new`, store
//! it in your handler struct, and clone() it every time you pass
//! it to the DavHandler. As a MemFs struct is just a handle, cloning is cheap.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::{future, stream, FutureExt};
use parking_lot::Mutex;

use crate::davpath::DavPath;
use crate::fs::*;

#[derive(Debug, Clone)]
enum NodeData {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    modified: SystemTime,
}

impl Node {
    fn new_dir() -> Node {
        Node {
            data: NodeData::Dir,
            modified: SystemTime::now(),
        }
    }

    fn new_file() -> Node {
        Node {
            data: NodeData::File(Vec::new()),
            modified: SystemTime::now(),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.data, NodeData::Dir)
    }

    fn meta(&self) -> MemFsMetaData {
        MemFsMetaData {
            size: match &self.data {
                NodeData::File(d) => d.len() as u64,
                NodeData::Dir => 0,
            },
            modified: self.modified,
            is_dir: self.is_dir(),
        }
    }
}

// Keyed by normalized path ("/", "/a", "/a/b").
type Tree = BTreeMap<String, Node>;

/// Ephemeral in-memory filesystem.
#[derive(Debug, Clone)]
pub struct MemFs {
    tree: Arc<Mutex<Tree>>,
    capacity: Option<u64>,
}

#[derive(Debug, Clone)]
struct MemFsMetaData {
    size: u64,
    modified: SystemTime,
    is_dir: bool,
}

#[derive(Debug)]
struct MemFsFile {
    tree: Arc<Mutex<Tree>>,
    path: String,
    pos: usize,
    append: bool,
}

struct MemFsDirEntry {
    name: Vec<u8>,
    meta: MemFsMetaData,
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn is_child_of(path: &str, dir: &str) -> bool {
    path != dir && parent_of(path) == dir
}

fn is_descendant_of(path: &str, dir: &str) -> bool {
    dir == "/" || path.strip_prefix(dir).map_or(false, |r| r.starts_with('/'))
}

impl MemFs {
    /// Create a new, empty filesystem without capacity information.
    pub fn new() -> Arc<MemFs> {
        Arc::new(Self::build(None))
    }

    /// Create a new, empty filesystem that reports `total` bytes of capacity.
    pub fn with_capacity(total: u64) -> Arc<MemFs> {
        Arc::new(Self::build(Some(total)))
    }

    fn build(capacity: Option<u64>) -> MemFs {
        let mut tree = Tree::new();
        tree.insert("/".to_string(), Node::new_dir());
        MemFs {
            tree: Arc::new(Mutex::new(tree)),
            capacity,
        }
    }

    /// Force the modification time of an entry.
    pub fn set_modified(&self, path: &str, modified: SystemTime) -> FsResult<()> {
        let mut tree = self.tree.lock();
        let node = tree.get_mut(path).ok_or(FsError::NotFound)?;
        node.modified = modified;
        Ok(())
    }

    fn parent_is_dir(tree: &Tree, path: &str) -> FsResult<()> {
        match tree.get(parent_of(path)) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(FsError::Forbidden),
            None => Err(FsError::NotFound),
        }
    }

    fn do_open(&self, path: &str, options: OpenOptions) -> FsResult<Box<dyn DavFile>> {
        let mut tree = self.tree.lock();
        match tree.get_mut(path) {
            Some(node) if node.is_dir() => return Err(FsError::Forbidden),
            Some(node) => {
                if options.truncate {
                    node.data = NodeData::File(Vec::new());
                    node.modified = SystemTime::now();
                }
            }
            None => {
                if !options.create {
                    return Err(FsError::NotFound);
                }
                Self::parent_is_dir(&tree, path)?;
                tree.insert(path.to_string(), Node::new_file());
            }
        }
        Ok(Box::new(MemFsFile {
            tree: self.tree.clone(),
            path: path.to_string(),
            pos: 0,
            append: options.append,
        }))
    }

    fn do_create_dir(&self, path: &str) -> FsResult<()> {
        let mut tree = self.tree.lock();
        if tree.contains_key(path) {
            return Err(FsError::Exists);
        }
        Self::parent_is_dir(&tree, path)?;
        tree.insert(path.to_string(), Node::new_dir());
        Ok(())
    }

    fn do_remove(&self, path: &str, dir: bool) -> FsResult<()> {
        let mut tree = self.tree.lock();
        let node = tree.get(path).ok_or(FsError::NotFound)?;
        if node.is_dir() != dir || path == "/" {
            return Err(FsError::Forbidden);
        }
        if dir && tree.keys().any(|k| is_child_of(k, path)) {
            return Err(FsError::Forbidden);
        }
        tree.remove(path);
        Ok(())
    }

    fn do_rename(&self, from: &str, to: &str) -> FsResult<()> {
        let mut tree = self.tree.lock();
        let node = tree.get(from).ok_or(FsError::NotFound)?;
        if from == "/" || to == "/" || is_descendant_of(to, from) {
            return Err(FsError::Forbidden);
        }
        let from_dir = node.is_dir();
        Self::parent_is_dir(&tree, to)?;
        if let Some(target) = tree.get(to) {
            if target.is_dir() {
                return Err(FsError::Exists);
            }
        }
        let moved: Vec<String> = if from_dir {
            tree.keys()
                .filter(|k| k.as_str() == from || is_descendant_of(k, from))
                .cloned()
                .collect()
        } else {
            vec![from.to_string()]
        };
        for old in moved {
            if let Some(node) = tree.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                tree.insert(new, node);
            }
        }
        Ok(())
    }

    fn do_read_dir(&self, path: &str) -> FsResult<Vec<Box<dyn DavDirEntry>>> {
        let tree = self.tree.lock();
        match tree.get(path) {
            Some(node) if node.is_dir() => {}
            Some(_) => return Err(FsError::Forbidden),
            None => return Err(FsError::NotFound),
        }
        let entries = tree
            .iter()
            .filter(|(k, _)| is_child_of(k, path))
            .map(|(k, node)| {
                let name = k.rsplit('/').next().unwrap_or_default();
                Box::new(MemFsDirEntry {
                    name: name.as_bytes().to_vec(),
                    meta: node.meta(),
                }) as Box<dyn DavDirEntry>
            })
            .collect();
        Ok(entries)
    }

    fn used(&self) -> u64 {
        self.tree.lock().values().map(|n| n.meta().size).sum()
    }
}

impl DavFileSystem for MemFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        let tree = self.tree.lock();
        let res = match tree.get(path.as_str()) {
            Some(node) => Ok(Box::new(node.meta()) as Box<dyn DavMetaData>),
            None => Err(FsError::NotFound),
        };
        future::ready(res).boxed()
    }

    fn read_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        trace!("FS: read_dir {path:?}");
        let res = self
            .do_read_dir(path.as_str())
            .map(|v| Box::pin(stream::iter(v)) as FsStream<Box<dyn DavDirEntry>>);
        future::ready(res).boxed()
    }

    fn open<'a>(
        &'a self,
        path: &'a DavPath,
        options: OpenOptions,
    ) -> FsFuture<'a, Box<dyn DavFile>> {
        trace!("FS: open {path:?}");
        future::ready(self.do_open(path.as_str(), options)).boxed()
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("FS: create_dir {path:?}");
        future::ready(self.do_create_dir(path.as_str())).boxed()
    }

    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("FS: remove_dir {path:?}");
        future::ready(self.do_remove(path.as_str(), true)).boxed()
    }

    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("FS: remove_file {path:?}");
        future::ready(self.do_remove(path.as_str(), false)).boxed()
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("FS: rename {from:?} {to:?}");
        future::ready(self.do_rename(from.as_str(), to.as_str())).boxed()
    }

    fn get_quota(&self) -> FsFuture<'_, (u64, u64)> {
        let res = match self.capacity {
            Some(total) => Ok((self.used(), total)),
            None => Err(FsError::NotImplemented),
        };
        future::ready(res).boxed()
    }
}

impl MemFsFile {
    fn with_data<T>(&self, f: impl FnOnce(&mut Node) -> FsResult<T>) -> FsResult<T> {
        let mut tree = self.tree.lock();
        match tree.get_mut(&self.path) {
            Some(node) if !node.is_dir() => f(node),
            // removed or replaced while open.
            _ => Err(FsError::NotFound),
        }
    }
}

impl DavFile for MemFsFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let res = self.with_data(|node| Ok(Box::new(node.meta()) as Box<dyn DavMetaData>));
        future::ready(res).boxed()
    }

    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()> {
        let append = self.append;
        let mut pos = self.pos;
        let res = self.with_data(|node| {
            if let NodeData::File(data) = &mut node.data {
                if append {
                    pos = data.len();
                }
                let end = pos + buf.len();
                if data.len() < end {
                    data.resize(end, 0);
                }
                data[pos..end].copy_from_slice(&buf);
                pos = end;
            }
            node.modified = SystemTime::now();
            Ok(())
        });
        self.pos = pos;
        future::ready(res).boxed()
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        let pos = self.pos;
        let res = self.with_data(|node| match &node.data {
            NodeData::File(data) => {
                let start = pos.min(data.len());
                let end = (start + count).min(data.len());
                Ok(Bytes::copy_from_slice(&data[start..end]))
            }
            NodeData::Dir => Err(FsError::Forbidden),
        });
        if let Ok(b) = &res {
            self.pos += b.len();
        }
        future::ready(res).boxed()
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        future::ready(Ok(())).boxed()
    }
}

impl DavDirEntry for MemFsDirEntry {
    fn name(&self) -> Vec<u8> {
        self.name.clone()
    }

    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        future::ready(Ok(Box::new(self.meta.clone()) as Box<dyn DavMetaData>)).boxed()
    }
}

impl DavMetaData for MemFsMetaData {
    fn len(&self) -> u64 {
        self.size
    }

    fn modified(&self) -> FsResult<SystemTime> {
        Ok(self.modified)
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn p(s: &str) -> DavPath {
        DavPath::from_str_and_prefix(s, "").unwrap()
    }

    #[test]
    fn parents() {
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(parent_of("/a/b"), "/a");
        assert!(is_child_of("/a", "/"));
        assert!(!is_child_of("/a/b", "/"));
        assert!(is_descendant_of("/a/b/c", "/a"));
        assert!(!is_descendant_of("/ab", "/a"));
    }

    #[tokio::test]
    async fn write_read_append() {
        let fs = MemFs::new();
        let mut f = fs.open(&p("/f"), OpenOptions::write()).await.unwrap();
        f.write_bytes(Bytes::from_static(b"hello")).await.unwrap();
        drop(f);
        let mut f = fs.open(&p("/f"), OpenOptions::append()).await.unwrap();
        f.write_bytes(Bytes::from_static(b" world")).await.unwrap();
        drop(f);
        let mut f = fs.open(&p("/f"), OpenOptions::read()).await.unwrap();
        assert_eq!(&f.read_bytes(100).await.unwrap()[..], b"hello world");
        assert!(f.read_bytes(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dirs() {
        let fs = MemFs::new();
        fs.create_dir(&p("/d")).await.unwrap();
        assert_eq!(fs.create_dir(&p("/d")).await, Err(FsError::Exists));
        assert_eq!(fs.create_dir(&p("/x/y")).await, Err(FsError::NotFound));
        fs.open(&p("/d/f"), OpenOptions::write()).await.unwrap();
        fs.create_dir(&p("/d/sub")).await.unwrap();
        fs.open(&p("/d/sub/g"), OpenOptions::write()).await.unwrap();

        let names: Vec<Vec<u8>> = fs
            .read_dir(&p("/d"))
            .await
            .unwrap()
            .map(|e| e.name())
            .collect()
            .await;
        assert_eq!(names, vec![b"f".to_vec(), b"sub".to_vec()]);

        // not empty.
        assert!(fs.remove_dir(&p("/d")).await.is_err());
        fs.rename(&p("/d"), &p("/e")).await.unwrap();
        assert!(fs.metadata(&p("/e/sub/g")).await.is_ok());
        assert!(fs.metadata(&p("/d")).await.is_err());
    }

    #[tokio::test]
    async fn quota() {
        let fs = MemFs::new();
        assert_eq!(fs.get_quota().await, Err(FsError::NotImplemented));
        let fs = MemFs::with_capacity(1000);
        let mut f = fs.open(&p("/f"), OpenOptions::write()).await.unwrap();
        f.write_bytes(Bytes::from_static(b"0123456789")).await.unwrap();
        assert_eq!(fs.get_quota().await, Ok((10, 1000)));
    }
}
