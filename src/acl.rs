//! Access control.
//!
//! Every method handler asks the configured [`DavAccess`] what may be done
//! at the request path before it touches the resource.
use dyn_clone::{DynClone, clone_trait_object};

use crate::davpath::DavPath;

/// Capability set for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DavAcl {
    /// GET/HEAD on files.
    pub read:     bool,
    /// PUT.
    pub write:    bool,
    /// DELETE.
    pub delete:   bool,
    /// MKCOL.
    pub create:   bool,
    /// COPY and MOVE.
    pub relocate: bool,
    /// PROPFIND, and GET on collections.
    pub listing:  bool,
}

impl DavAcl {
    /// Everything allowed.
    pub fn full() -> DavAcl {
        DavAcl {
            read:     true,
            write:    true,
            delete:   true,
            create:   true,
            relocate: true,
            listing:  true,
        }
    }

    /// Reading and listing only. This is the default.
    pub fn read_only() -> DavAcl {
        DavAcl {
            read: true,
            listing: true,
            ..DavAcl::default()
        }
    }

    /// Nothing allowed.
    pub fn none() -> DavAcl {
        DavAcl::default()
    }
}

/// Decides the capabilities of a client at a path.
pub trait DavAccess: Send + Sync + DynClone {
    fn capabilities(&self, path: &DavPath) -> DavAcl;
}

clone_trait_object! {DavAccess}

/// A plain `DavAcl` grants the same capabilities everywhere.
impl DavAccess for DavAcl {
    fn capabilities(&self, _path: &DavPath) -> DavAcl {
        *self
    }
}
