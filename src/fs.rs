//! Contains the structs and traits that define a resource backend.
//!
//! The dispatcher never touches storage itself; everything it knows about
//! a resource comes through [`DavFileSystem`] and [`DavMetaData`].
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use dyn_clone::{DynClone, clone_trait_object};
use futures_util::Stream;

use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::resource::{self, ResourceStream};

macro_rules! notimplemented {
    ($method:expr) => {
        Box::pin(futures_util::future::ready(Err(FsError::NotImplemented)))
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
    /// tried to create something, but it existed (405 / 412)
    Exists,
    /// File / Directory not found (404)
    NotFound,
    /// Not allowed (403)
    Forbidden,
    /// Intermediate collection missing (409)
    Conflict,
    /// Out of space (507)
    InsufficientStorage,
    /// Symbolic link loop detected (ELOOP) (508)
    LoopDetected,
    /// The path is too long (ENAMETOOLONG) (414)
    PathTooLong,
    /// The file being PUT is too large (413)
    TooLarge,
    /// Trying to MOVE over a mount boundary (EXDEV) (502)
    IsRemote,
}

impl std::error::Error for FsError {}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<FsError> for std::io::Error {
    fn from(e: FsError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, e)
    }
}

/// The Result type.
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Future returned by almost all of the DavFileSystem methods.
pub type FsFuture<'a, T> = Pin<Box<dyn Future<Output = FsResult<T>> + Send + 'a>>;

/// Convenience alias for a boxed Stream.
pub type FsStream<T> = Pin<Box<dyn Stream<Item = FsResult<T>> + Send>>;

/// One failed member of a COPY or MOVE.
#[derive(Debug, Clone, PartialEq)]
pub struct FsFailure {
    /// The member that could not be copied or moved.
    pub path:  DavPath,
    pub error: FsError,
}

impl FsFailure {
    pub fn new(path: &DavPath, error: FsError) -> FsFailure {
        FsFailure {
            path: path.clone(),
            error,
        }
    }
}

/// The resource backend trait.
///
/// Read operations are required. The write operations default to
/// `FsError::NotImplemented`, so a read-only backend only needs to
/// implement `metadata`, `read_dir` and `read`.
pub trait DavFileSystem: Send + Sync + DynClone {
    /// Return the metadata of a resource. Fails with `FsError::NotFound`
    /// if there is nothing at `path`.
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>>;

    /// List the direct members of a collection.
    fn read_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>>;

    /// Open a file for reading.
    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Bytes>>;

    /// Create or truncate a file and write `data` to it.
    #[allow(unused_variables)]
    fn write<'a>(&'a self, path: &'a DavPath, data: FsStream<Bytes>) -> FsFuture<'a, ()> {
        notimplemented!("write")
    }

    /// Create a collection. The parent must exist.
    #[allow(unused_variables)]
    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        notimplemented!("create_dir")
    }

    /// Remove a resource, recursively for collections.
    #[allow(unused_variables)]
    fn remove<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        notimplemented!("remove")
    }

    /// Copy a resource. `depth` is either `Zero` (collection only, without
    /// members) or `Infinity`. Members that could not be copied are
    /// returned; an `Err` means nothing was copied at all.
    #[allow(unused_variables)]
    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, depth: Depth) -> FsFuture<'a, Vec<FsFailure>> {
        notimplemented!("copy")
    }

    /// Move a resource, with the same failure reporting as `copy`.
    #[allow(unused_variables)]
    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, Vec<FsFailure>> {
        notimplemented!("rename")
    }

    /// Lazily walk `path` and its members, up to `depth`.
    fn descendants<'a>(&'a self, path: &'a DavPath, depth: Depth) -> ResourceStream<'a> {
        resource::walk(self, path.clone(), depth)
    }
}

clone_trait_object! {DavFileSystem}

/// One directory entry (or child node).
pub trait DavDirEntry: Send + Sync {
    /// Name of the entry.
    fn name(&self) -> Vec<u8>;

    /// Metadata of the entry.
    fn metadata<'a>(&'a self) -> FsFuture<'a, Box<dyn DavMetaData>>;

    /// Default implementation of `is_dir` just returns `metadata()?.is_dir()`.
    /// Implementations can override this if their `metadata()` method is
    /// expensive and there is a cheaper way to provide the same info.
    fn is_dir<'a>(&'a self) -> FsFuture<'a, bool> {
        Box::pin(async move { Ok(self.metadata().await?.is_dir()) })
    }
}

/// Metadata of a resource.
pub trait DavMetaData: Debug + Send + Sync + DynClone {
    /// Size of the file.
    fn len(&self) -> u64;
    /// `Modified` timestamp.
    fn modified(&self) -> FsResult<SystemTime>;
    /// File or collection (directory).
    fn is_dir(&self) -> bool;

    /// Simplistic implementation of `etag()`
    ///
    /// Returns a simple etag that basically is `\<length\>-\<timestamp_in_ms\>`
    /// with the numbers in hex. Enough for most implementations.
    fn etag(&self) -> Option<String> {
        if let Ok(t) = self.modified() {
            if let Ok(t) = t.duration_since(UNIX_EPOCH) {
                let t = t.as_secs() * 1000000 + t.subsec_nanos() as u64 / 1000;
                let tag = if self.is_file() {
                    format!("{:x}-{:x}", self.len(), t)
                } else {
                    format!("{:x}", t)
                };
                return Some(tag);
            }
        }
        None
    }

    /// Is this a file and not a directory. Default: `!is_dir()`.
    fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// Creation time.
    fn created(&self) -> FsResult<SystemTime> {
        Err(FsError::NotImplemented)
    }
}

clone_trait_object! {DavMetaData}
