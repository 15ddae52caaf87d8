use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::fs::{FsError, FsResult};

#[derive(Debug)]
/// A tree contains a bunch of nodes.
pub struct Tree<K: Eq + Hash, D> {
    nodes:   HashMap<u64, Node<K, D>>,
    node_id: u64,
}

/// id of the root node of the tree.
pub const ROOT_ID: u64 = 1;

#[derive(Debug)]
/// Node itself. "data" contains user-modifiable data.
pub struct Node<K: Eq + Hash, D> {
    pub data:  D,
    parent_id: u64,
    children:  HashMap<K, u64>,
}

#[derive(Debug)]
// Iterator over the children of a node.
pub struct Children<K>(std::vec::IntoIter<(K, u64)>);

impl<K: Eq + Hash + Debug + Clone, D: Debug> Tree<K, D> {
    /// Get new tree and initialize the root with 'data'.
    pub fn new(data: D) -> Tree<K, D> {
        let mut t = Tree {
            nodes:   HashMap::new(),
            node_id: ROOT_ID,
        };
        t.new_node(0, data);
        t
    }

    fn new_node(&mut self, parent: u64, data: D) -> u64 {
        let id = self.node_id;
        self.node_id += 1;
        let node = Node {
            parent_id: parent,
            data,
            children: HashMap::new(),
        };
        self.nodes.insert(id, node);
        id
    }

    /// add a child node to an existing node. With "overwrite", an
    /// existing child with the same key is deleted first, including
    /// its subtree.
    pub fn add_child(&mut self, parent: u64, key: K, data: D, overwrite: bool) -> FsResult<u64> {
        let existing = {
            let pnode = self.nodes.get(&parent).ok_or(FsError::NotFound)?;
            pnode.children.get(&key).copied()
        };
        if let Some(old) = existing {
            if !overwrite {
                return Err(FsError::Exists);
            }
            self.delete_subtree(old)?;
        }
        let id = self.new_node(parent, data);
        let pnode = self.nodes.get_mut(&parent).ok_or(FsError::NotFound)?;
        pnode.children.insert(key, id);
        Ok(id)
    }

    /// Get a child node by key K.
    pub fn get_child<Q>(&self, parent: u64, key: &Q) -> FsResult<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pnode = self.nodes.get(&parent).ok_or(FsError::NotFound)?;
        let id = pnode.children.get(key).ok_or(FsError::NotFound)?;
        Ok(*id)
    }

    /// Get all children of this node. Returns an iterator over <K, id>.
    pub fn get_children(&self, parent: u64) -> FsResult<Children<K>> {
        let pnode = self.nodes.get(&parent).ok_or(FsError::NotFound)?;
        let v = pnode.children.iter().map(|(k, i)| (k.clone(), *i)).collect::<Vec<_>>();
        Ok(Children(v.into_iter()))
    }

    /// Get reference to a node.
    pub fn get_node(&self, id: u64) -> FsResult<&D> {
        let n = self.nodes.get(&id).ok_or(FsError::NotFound)?;
        Ok(&n.data)
    }

    /// Get mutable reference to a node.
    pub fn get_node_mut(&mut self, id: u64) -> FsResult<&mut D> {
        let n = self.nodes.get_mut(&id).ok_or(FsError::NotFound)?;
        Ok(&mut n.data)
    }

    fn delete_node_from_parent(&mut self, id: u64) -> FsResult<()> {
        let parent_id = self.nodes.get(&id).ok_or(FsError::NotFound)?.parent_id;
        if let Some(pnode) = self.nodes.get_mut(&parent_id) {
            pnode.children.retain(|_, i| *i != id);
        }
        Ok(())
    }

    /// Delete a subtree. The root node cannot be deleted.
    pub fn delete_subtree(&mut self, id: u64) -> FsResult<()> {
        if id == ROOT_ID {
            return Err(FsError::Forbidden);
        }
        self.delete_node_from_parent(id)?;
        let mut todo = vec![id];
        while let Some(id) = todo.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                todo.extend(node.children.values());
            }
        }
        Ok(())
    }

    /// Move a node to a new position and new name in the tree.
    /// If "overwrite" is true, will replace an existing node
    /// (and its subtree).
    pub fn move_node(&mut self, id: u64, new_parent: u64, new_name: K, overwrite: bool) -> FsResult<()> {
        let dest = {
            let pnode = self.nodes.get(&new_parent).ok_or(FsError::NotFound)?;
            pnode.children.get(&new_name).copied()
        };
        if let Some(dest) = dest {
            if dest == id {
                return Ok(());
            }
            if !overwrite {
                return Err(FsError::Exists);
            }
            self.delete_subtree(dest)?;
        }
        self.delete_node_from_parent(id)?;
        self.nodes.get_mut(&id).ok_or(FsError::NotFound)?.parent_id = new_parent;
        let pnode = self.nodes.get_mut(&new_parent).ok_or(FsError::NotFound)?;
        pnode.children.insert(new_name, id);
        Ok(())
    }
}

impl<K> Iterator for Children<K> {
    type Item = (K, u64);
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
