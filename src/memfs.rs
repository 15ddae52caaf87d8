//! Simple in-memory filesystem.
//!
//! This implementation has state, so if you create a
//! new instance in a handler(), it will be empty every time.
//!
//! This means you have to create the instance once, using `MemFs::new`, store
//! it in your handler struct, and clone() it every time you pass
//! it to the DavHandler. As a MemFs struct is just a handle, cloning is cheap.
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, future, stream};
use parking_lot::Mutex;

use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::fs::*;
use crate::tree;

type Tree = tree::Tree<Vec<u8>, MemFsNode>;

/// Ephemeral in-memory filesystem.
#[derive(Debug, Clone)]
pub struct MemFs {
    tree: Arc<Mutex<Tree>>,
}

#[derive(Debug, Clone)]
enum MemFsNode {
    Dir(MemFsDirNode),
    File(MemFsFileNode),
}

#[derive(Debug, Clone)]
struct MemFsDirNode {
    mtime:  SystemTime,
    crtime: SystemTime,
}

#[derive(Debug, Clone)]
struct MemFsFileNode {
    mtime:  SystemTime,
    crtime: SystemTime,
    data:   Bytes,
}

#[derive(Debug, Clone)]
struct MemFsDirEntry {
    mtime:  SystemTime,
    crtime: SystemTime,
    is_dir: bool,
    name:   Vec<u8>,
    size:   u64,
}

impl MemFs {
    /// Create a new "memfs" filesystem.
    pub fn new() -> Box<MemFs> {
        let root = MemFsNode::new_dir(SystemTime::now());
        Box::new(MemFs {
            tree: Arc::new(Mutex::new(Tree::new(root))),
        })
    }
}

impl DavFileSystem for MemFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        let tree = &*self.tree.lock();
        let res = tree.lookup(path.as_bytes()).and_then(|node_id| {
            let meta = tree.get_node(node_id)?.as_dirent(path.file_name());
            Ok(Box::new(meta) as Box<dyn DavMetaData>)
        });
        Box::pin(future::ready(res))
    }

    fn read_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        Box::pin(async move {
            let tree = &*self.tree.lock();
            let node_id = tree.lookup(path.as_bytes())?;
            if !tree.get_node(node_id)?.is_dir() {
                return Err(FsError::Forbidden);
            }
            let mut v = Vec::new();
            for (name, dnode_id) in tree.get_children(node_id)? {
                if let Ok(node) = tree.get_node(dnode_id) {
                    v.push(node.as_dirent(&name));
                }
            }
            v.sort_by(|a, b| a.name.cmp(&b.name));
            let strm = stream::iter(v.into_iter().map(|e| Ok(Box::new(e) as Box<dyn DavDirEntry>)));
            Ok(Box::pin(strm) as FsStream<Box<dyn DavDirEntry>>)
        })
    }

    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Bytes>> {
        Box::pin(async move {
            let tree = &*self.tree.lock();
            let node_id = tree.lookup(path.as_bytes())?;
            let data = tree.get_node(node_id)?.as_file()?.data.clone();
            Ok(Box::pin(stream::once(future::ready(Ok(data)))) as FsStream<Bytes>)
        })
    }

    fn write<'a>(&'a self, path: &'a DavPath, mut data: FsStream<Bytes>) -> FsFuture<'a, ()> {
        Box::pin(async move {
            let mut buf = BytesMut::new();
            while let Some(chunk) = data.next().await {
                buf.extend_from_slice(&chunk?);
            }
            trace!("FS: write {:?} ({} bytes)", path, buf.len());

            let now = SystemTime::now();
            let tree = &mut *self.tree.lock();
            let path = path.as_bytes();
            let parent_id = tree.lookup_parent(path)?;
            match tree.lookup(path) {
                Ok(node_id) => {
                    let file = tree.get_node_mut(node_id)?.as_file_mut()?;
                    file.data = buf.freeze();
                    file.mtime = now;
                },
                Err(FsError::NotFound) => {
                    let mut node = MemFsNode::new_file(now);
                    node.as_file_mut()?.data = buf.freeze();
                    tree.add_child(parent_id, file_name(path), node, false)?;
                    tree.get_node_mut(parent_id)?.update_mtime(now);
                },
                Err(e) => return Err(e),
            }
            Ok(())
        })
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            trace!("FS: create_dir {:?}", path);
            let now = SystemTime::now();
            let tree = &mut *self.tree.lock();
            let path = path.as_bytes();
            let parent_id = tree.lookup_parent(path)?;
            tree.add_child(parent_id, file_name(path), MemFsNode::new_dir(now), false)?;
            tree.get_node_mut(parent_id)?.update_mtime(now);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            trace!("FS: remove {:?}", path);
            let tree = &mut *self.tree.lock();
            let node_id = tree.lookup(path.as_bytes())?;
            let parent_id = tree.lookup_parent(path.as_bytes())?;
            tree.delete_subtree(node_id)?;
            tree.get_node_mut(parent_id)?.update_mtime(SystemTime::now());
            Ok(())
        })
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, depth: Depth) -> FsFuture<'a, Vec<FsFailure>> {
        Box::pin(async move {
            trace!("FS: copy {:?} {:?} {:?}", from, to, depth);
            if from.is_ancestor_of(to) {
                return Err(FsError::Forbidden);
            }
            let tree = &mut *self.tree.lock();
            let src_id = tree.lookup(from.as_bytes())?;
            let dst_parent = tree.lookup_parent(to.as_bytes())?;

            let mut failures = Vec::new();
            let deep = depth == Depth::Infinity;
            tree.copy_node(src_id, dst_parent, file_name(to.as_bytes()), deep, to, &mut failures)?;
            tree.get_node_mut(dst_parent)?.update_mtime(SystemTime::now());
            Ok(failures)
        })
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, Vec<FsFailure>> {
        Box::pin(async move {
            trace!("FS: rename {:?} {:?}", from, to);
            if from.is_ancestor_of(to) {
                return Err(FsError::Forbidden);
            }
            let tree = &mut *self.tree.lock();
            let node_id = tree.lookup(from.as_bytes())?;
            let parent_id = tree.lookup_parent(from.as_bytes())?;
            let dst_id = tree.lookup_parent(to.as_bytes())?;
            tree.move_node(node_id, dst_id, file_name(to.as_bytes()), true)?;
            let now = SystemTime::now();
            tree.get_node_mut(parent_id)?.update_mtime(now);
            tree.get_node_mut(dst_id)?.update_mtime(now);
            Ok(Vec::new())
        })
    }
}

impl DavDirEntry for MemFsDirEntry {
    fn metadata<'a>(&'a self) -> FsFuture<'a, Box<dyn DavMetaData>> {
        let meta = (*self).clone();
        Box::pin(future::ok(Box::new(meta) as Box<dyn DavMetaData>))
    }

    fn name(&self) -> Vec<u8> {
        self.name.clone()
    }
}

impl DavMetaData for MemFsDirEntry {
    fn len(&self) -> u64 {
        self.size
    }

    fn created(&self) -> FsResult<SystemTime> {
        Ok(self.crtime)
    }

    fn modified(&self) -> FsResult<SystemTime> {
        Ok(self.mtime)
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }
}

impl MemFsNode {
    fn new_dir(now: SystemTime) -> MemFsNode {
        MemFsNode::Dir(MemFsDirNode {
            crtime: now,
            mtime:  now,
        })
    }

    fn new_file(now: SystemTime) -> MemFsNode {
        MemFsNode::File(MemFsFileNode {
            crtime: now,
            mtime:  now,
            data:   Bytes::new(),
        })
    }

    // a copy is a new resource: both timestamps are reset.
    fn copied(&self, now: SystemTime) -> MemFsNode {
        match self {
            MemFsNode::Dir(_) => MemFsNode::new_dir(now),
            MemFsNode::File(f) => MemFsNode::File(MemFsFileNode {
                crtime: now,
                mtime:  now,
                data:   f.data.clone(),
            }),
        }
    }

    // helper to create MemFsDirEntry from a node.
    fn as_dirent(&self, name: &[u8]) -> MemFsDirEntry {
        let (is_dir, size, mtime, crtime) = match self {
            MemFsNode::File(file) => (false, file.data.len() as u64, file.mtime, file.crtime),
            MemFsNode::Dir(dir) => (true, 0, dir.mtime, dir.crtime),
        };
        MemFsDirEntry {
            name: name.to_vec(),
            mtime,
            crtime,
            is_dir,
            size,
        }
    }

    fn update_mtime(&mut self, tm: SystemTime) {
        match self {
            MemFsNode::Dir(d) => d.mtime = tm,
            MemFsNode::File(f) => f.mtime = tm,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, MemFsNode::Dir(_))
    }

    fn as_file(&self) -> FsResult<&MemFsFileNode> {
        match self {
            MemFsNode::File(n) => Ok(n),
            _ => Err(FsError::Forbidden),
        }
    }

    fn as_file_mut(&mut self) -> FsResult<&mut MemFsFileNode> {
        match self {
            MemFsNode::File(n) => Ok(n),
            _ => Err(FsError::Forbidden),
        }
    }
}

trait TreeExt {
    fn lookup_segs(&self, segs: Vec<&[u8]>) -> FsResult<u64>;
    fn lookup(&self, path: &[u8]) -> FsResult<u64>;
    fn lookup_parent(&self, path: &[u8]) -> FsResult<u64>;
    fn copy_node(
        &mut self,
        src: u64,
        dst_parent: u64,
        name: Vec<u8>,
        deep: bool,
        dst_path: &DavPath,
        failures: &mut Vec<FsFailure>,
    ) -> FsResult<()>;
}

impl TreeExt for Tree {
    fn lookup_segs(&self, segs: Vec<&[u8]>) -> FsResult<u64> {
        let mut node_id = tree::ROOT_ID;
        for seg in segs.into_iter() {
            if !self.get_node(node_id)?.is_dir() {
                return Err(FsError::NotFound);
            }
            node_id = self.get_child(node_id, seg)?;
        }
        Ok(node_id)
    }

    fn lookup(&self, path: &[u8]) -> FsResult<u64> {
        self.lookup_segs(segments(path))
    }

    // pop the last segment off the path, do a lookup, then
    // check if the result is a directory.
    fn lookup_parent(&self, path: &[u8]) -> FsResult<u64> {
        let mut segs = segments(path);
        if segs.pop().is_none() {
            return Err(FsError::Forbidden);
        }
        let node_id = self.lookup_segs(segs).map_err(|_| FsError::Conflict)?;
        if !self.get_node(node_id)?.is_dir() {
            return Err(FsError::Conflict);
        }
        Ok(node_id)
    }

    // Files replace whatever is at the destination. Collections merge
    // into an existing destination collection. Members that fail are
    // recorded and skipped.
    fn copy_node(
        &mut self,
        src: u64,
        dst_parent: u64,
        name: Vec<u8>,
        deep: bool,
        dst_path: &DavPath,
        failures: &mut Vec<FsFailure>,
    ) -> FsResult<()> {
        let now = SystemTime::now();
        let node = self.get_node(src)?.copied(now);
        if !node.is_dir() {
            self.add_child(dst_parent, name, node, true)?;
            return Ok(());
        }
        let existing = self.get_child(dst_parent, &name).ok();
        let dst = match existing {
            Some(id) if self.get_node(id)?.is_dir() => {
                self.get_node_mut(id)?.update_mtime(now);
                id
            },
            _ => self.add_child(dst_parent, name, node, true)?,
        };
        if !deep {
            return Ok(());
        }
        for (cname, cid) in self.get_children(src)? {
            let mut cpath = dst_path.clone();
            cpath.push_segment(&cname);
            if let Err(e) = self.copy_node(cid, dst, cname, true, &cpath, failures) {
                debug!("FS: copy {:?}: {:?}", cpath, e);
                failures.push(FsFailure::new(&cpath, e));
            }
        }
        Ok(())
    }
}

fn segments(path: &[u8]) -> Vec<&[u8]> {
    path.split(|&c| c == b'/').filter(|s| !s.is_empty()).collect()
}

// helper
fn file_name(path: &[u8]) -> Vec<u8> {
    segments(path).last().copied().unwrap_or(b"").to_vec()
}
