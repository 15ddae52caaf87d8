//! Simple in-memory locksystem.
//!
//! This implementation has state - if you create a
//! new instance in a handler(), it will be empty every time.
//!
//! This means you have to create the instance once, using `MemLs::new`, store
//! it in your handler struct, and clone() it every time you pass
//! it to the DavHandler. As a MemLs struct is just a handle, cloning is cheap.
use std::sync::Arc;

use futures_util::future;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::davpath::DavPath;
use crate::ls::*;
use crate::tree;

type Tree = tree::Tree<Vec<u8>, Vec<DavLock>>;

/// Ephemeral in-memory LockSystem.
#[derive(Debug, Clone)]
pub struct MemLs(Arc<Mutex<Tree>>);

impl MemLs {
    /// Create a new "memls" locksystem.
    pub fn new() -> Box<MemLs> {
        Box::new(MemLs(Arc::new(Mutex::new(Tree::new(Vec::new())))))
    }

    /// Register a lock on `path`, returning its token.
    pub fn add(&self, path: &DavPath) -> String {
        let token = format!("opaquelocktoken:{}", Uuid::new_v4().hyphenated());
        let tree = &mut *self.0.lock();
        let mut node_id = tree::ROOT_ID;
        for seg in path_to_segs(path) {
            node_id = match tree.get_child(node_id, seg) {
                Ok(id) => id,
                Err(_) => match tree.add_child(node_id, seg.to_vec(), Vec::new(), false) {
                    Ok(id) => id,
                    Err(_) => return token,
                },
            };
        }
        if let Ok(locks) = tree.get_node_mut(node_id) {
            locks.push(DavLock {
                token: token.clone(),
                path:  path.clone(),
            });
        }
        trace!("memls: add {:?}: {}", path, token);
        token
    }
}

impl DavLockSystem for MemLs {
    fn discover<'a>(&'a self, path: &'a DavPath) -> LsFuture<'a, Vec<DavLock>> {
        let tree = &*self.0.lock();
        let mut locks = Vec::new();
        let mut node_id = tree::ROOT_ID;
        if let Ok(l) = tree.get_node(node_id) {
            locks.extend_from_slice(l);
        }
        for seg in path_to_segs(path) {
            node_id = match tree.get_child(node_id, seg) {
                Ok(id) => id,
                Err(_) => break,
            };
            if let Ok(l) = tree.get_node(node_id) {
                locks.extend_from_slice(l);
            }
        }
        Box::pin(future::ready(locks))
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> LsFuture<'a, Result<(), ()>> {
        let tree = &mut *self.0.lock();
        let mut node_id = Some(tree::ROOT_ID);
        for seg in path_to_segs(path) {
            node_id = node_id.and_then(|id| tree.get_child(id, seg).ok());
        }
        match node_id {
            Some(tree::ROOT_ID) => *tree = Tree::new(Vec::new()),
            Some(id) => {
                tree.delete_subtree(id).ok();
            },
            None => {},
        }
        Box::pin(future::ready(Ok(())))
    }
}

fn path_to_segs(path: &DavPath) -> Vec<&[u8]> {
    path.as_bytes().split(|&c| c == b'/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_discover_delete() {
        let ls = MemLs::new();
        let a = DavPath::new("/a/").unwrap();
        let ab = DavPath::new("/a/b").unwrap();
        let t1 = ls.add(&a);
        let t2 = ls.add(&ab);
        assert!(t1.starts_with("opaquelocktoken:"));

        let found = ls.discover(&ab).await;
        assert_eq!(found.len(), 2);
        assert_eq!(ls.discover(&a).await.len(), 1);
        assert!(ls.discover(&DavPath::new("/c").unwrap()).await.is_empty());

        ls.delete(&ab).await.unwrap();
        let found = ls.discover(&ab).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token, t1);
        assert_ne!(t1, t2);

        ls.delete(&DavPath::new("/").unwrap()).await.unwrap();
        assert!(ls.discover(&ab).await.is_empty());
    }
}
