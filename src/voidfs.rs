//! Placeholder filesystem, used when no filesystem is configured.
//! There is nothing in it.
use futures_util::future;

use bytes::Bytes;

use crate::davpath::DavPath;
use crate::fs::*;

/// Placeholder filesystem.
#[derive(Debug, Clone)]
pub(crate) struct VoidFs;

impl VoidFs {
    pub fn new() -> Box<VoidFs> {
        Box::new(VoidFs)
    }
}

impl DavFileSystem for VoidFs {
    fn metadata<'a>(&'a self, _path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        Box::pin(future::ready(Err(FsError::NotFound)))
    }

    fn read_dir<'a>(&'a self, _path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        Box::pin(future::ready(Err(FsError::NotFound)))
    }

    fn read<'a>(&'a self, _path: &'a DavPath) -> FsFuture<'a, FsStream<Bytes>> {
        Box::pin(future::ready(Err(FsError::NotFound)))
    }
}
