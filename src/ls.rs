//! Contains the structs and traits that define a `locksystem` backend.
//!
//! Locks are never taken through this crate (LOCK and UNLOCK answer
//! 501). The dispatcher only needs to find locks and to clear them when
//! the resources they cover go away after DELETE or MOVE.
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use dyn_clone::{DynClone, clone_trait_object};

use crate::davpath::DavPath;

/// Future returned by the DavLockSystem methods.
pub type LsFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type of the locks returned by DavLockSystem methods.
#[derive(Debug, Clone, PartialEq)]
pub struct DavLock {
    /// Token.
    pub token: String,
    /// Path.
    pub path:  DavPath,
}

/// The trait that defines a locksystem.
pub trait DavLockSystem: Debug + Send + Sync + DynClone {
    /// Find and return all locks that cover a given path.
    fn discover<'a>(&'a self, path: &'a DavPath) -> LsFuture<'a, Vec<DavLock>>;

    /// Delete all locks at this path and below (after MOVE or DELETE)
    fn delete<'a>(&'a self, path: &'a DavPath) -> LsFuture<'a, Result<(), ()>>;
}

clone_trait_object! {DavLockSystem}
