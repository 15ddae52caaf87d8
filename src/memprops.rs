//! Simple in-memory property store.
//!
//! Live properties are computed from the resource metadata; dead
//! properties are kept per path in memory and are lost when the
//! process exits. Like `MemLs`, a `MemProps` is a handle: create it
//! once and clone it.
use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future;
use parking_lot::Mutex;
use xmltree::{Element, XMLNode};

use crate::davpath::DavPath;
use crate::fs::FsFuture;
use crate::props::{DavPropStore, PropName, PropRequest, PropStat, collect_propstat};
use crate::resource::DavResource;

/// Ephemeral in-memory property store.
#[derive(Debug, Clone, Default)]
pub struct MemProps(Arc<Mutex<HashMap<Vec<u8>, Vec<Element>>>>);

fn key(path: &DavPath) -> Vec<u8> {
    path.as_trimmed_bytes().to_vec()
}

fn key_path(key: &[u8]) -> DavPath {
    DavPath {
        path:   key.to_vec(),
        prefix: Vec::new(),
    }
}

impl MemProps {
    /// Create a new "memprops" property store.
    pub fn new() -> Box<MemProps> {
        Box::new(MemProps::default())
    }

    /// Set a dead property.
    pub fn set(&self, path: &DavPath, name: &PropName, value: &str) {
        let mut elem = name.to_element();
        elem.children.push(XMLNode::Text(value.to_string()));
        let mut props = self.0.lock();
        let entry = props.entry(key(path)).or_default();
        entry.retain(|e| !name.matches(e));
        entry.push(elem);
    }

    /// Get the text value of a dead property.
    pub fn get(&self, path: &DavPath, name: &PropName) -> Option<String> {
        let props = self.0.lock();
        let elem = props.get(&key(path))?.iter().find(|e| name.matches(e))?;
        Some(elem.get_text().map(|t| t.to_string()).unwrap_or_default())
    }

    /// Remove a dead property.
    pub fn remove(&self, path: &DavPath, name: &PropName) {
        if let Some(entry) = self.0.lock().get_mut(&key(path)) {
            entry.retain(|e| !name.matches(e));
        }
    }

    fn keys_below(props: &HashMap<Vec<u8>, Vec<Element>>, path: &DavPath) -> Vec<Vec<u8>> {
        props
            .keys()
            .filter(|k| path.is_ancestor_of(&key_path(k)))
            .cloned()
            .collect()
    }
}

impl DavPropStore for MemProps {
    fn propstat<'a>(&'a self, res: &'a DavResource, req: &'a PropRequest) -> FsFuture<'a, Vec<PropStat>> {
        let dead = self.0.lock().get(&key(res.path())).cloned().unwrap_or_default();
        Box::pin(future::ready(Ok(collect_propstat(res, req, &dead))))
    }

    fn remove_all<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        let mut props = self.0.lock();
        for k in MemProps::keys_below(&props, path) {
            props.remove(&k);
        }
        Box::pin(future::ready(Ok(())))
    }

    fn copy_all<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, is_move: bool) -> FsFuture<'a, ()> {
        let mut props = self.0.lock();
        for k in MemProps::keys_below(&props, to) {
            props.remove(&k);
        }
        for k in MemProps::keys_below(&props, from) {
            let value = if is_move {
                props.remove(&k)
            } else {
                props.get(&k).cloned()
            };
            if let Some(value) = value {
                let dest = key_path(&k).rebase(from, to);
                props.insert(key(&dest), value);
            }
        }
        trace!("memprops: copy_all {:?} -> {:?} (move: {})", from, to, is_move);
        Box::pin(future::ready(Ok(())))
    }
}
