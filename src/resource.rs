//! The request-scoped view of one resource.
use std::time::SystemTime;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};

use crate::davheaders::{Depth, ETag};
use crate::davpath::DavPath;
use crate::errors::DavResult;
use crate::fs::{DavFileSystem, DavMetaData, FsError, FsResult};
use crate::httpdate;

/// A resource at a path, with its metadata if it exists.
///
/// Collections always have a path ending in `/`.
#[derive(Debug, Clone)]
pub struct DavResource {
    path: DavPath,
    meta: Option<Box<dyn DavMetaData>>,
}

/// Stream of resources, as returned by [`DavFileSystem::descendants`].
pub type ResourceStream<'a> = BoxStream<'a, FsResult<DavResource>>;

impl DavResource {
    pub fn new(path: DavPath, meta: Option<Box<dyn DavMetaData>>) -> DavResource {
        let mut path = path;
        if let Some(ref meta) = meta {
            path.add_slash_if(meta.is_dir());
        }
        DavResource { path, meta }
    }

    // look up `path`. A resource that is not there is not an error.
    pub(crate) async fn lookup(fs: &dyn DavFileSystem, path: &DavPath) -> DavResult<DavResource> {
        match fs.metadata(path).await {
            Ok(meta) => Ok(DavResource::new(path.clone(), Some(meta))),
            Err(FsError::NotFound) => Ok(DavResource::new(path.clone(), None)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &DavPath {
        &self.path
    }

    pub fn metadata(&self) -> Option<&dyn DavMetaData> {
        self.meta.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.meta.is_some()
    }

    pub fn is_collection(&self) -> bool {
        self.meta.as_ref().map(|m| m.is_dir()).unwrap_or(false)
    }

    /// Opaque entity tag, unquoted.
    pub fn etag(&self) -> Option<String> {
        self.meta.as_ref().and_then(|m| m.etag())
    }

    pub(crate) fn etag_header(&self) -> Option<ETag> {
        self.meta.as_ref().and_then(|m| ETag::from_meta(m.as_ref()))
    }

    pub fn mtime(&self) -> Option<SystemTime> {
        self.meta.as_ref().and_then(|m| m.modified().ok())
    }

    /// Modification time in whole seconds since the epoch.
    pub fn mtime_stamp(&self) -> Option<i64> {
        self.mtime().map(httpdate::systemtime_to_timestamp)
    }

    pub fn size(&self) -> u64 {
        self.meta.as_ref().map(|m| m.len()).unwrap_or(0)
    }

    /// Display name: the last path segment.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.path.file_name()).to_string()
    }

    /// URL encoded path including the prefix.
    pub fn url(&self) -> String {
        self.path.as_url_string_with_prefix()
    }
}

/// Walk `path` in pre-order, the resource itself first.
///
/// Collections are read one at a time, when the walk reaches them.
/// Members whose metadata cannot be read are skipped; an unreadable
/// collection is yielded but not descended into.
pub(crate) fn walk<'a, F>(fs: &'a F, path: DavPath, depth: Depth) -> ResourceStream<'a>
where
    F: DavFileSystem + ?Sized,
{
    let pending: Vec<(DavPath, u32, Option<Box<dyn DavMetaData>>)> = vec![(path, 0, None)];

    stream::unfold(pending, move |mut pending| async move {
        let (path, level, meta) = pending.pop()?;
        let meta = match meta {
            Some(meta) => meta,
            None => match fs.metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => return Some((Err(e), pending)),
            },
        };

        if meta.is_dir() && depth.includes(level + 1) {
            let mut members = Vec::new();
            match fs.read_dir(&path).await {
                Ok(mut entries) => {
                    while let Some(entry) = entries.next().await {
                        let entry = match entry {
                            Ok(entry) => entry,
                            Err(e) => {
                                debug!("walk: {:?}: read_dir: {:?}", path, e);
                                continue;
                            },
                        };
                        let emeta = match entry.metadata().await {
                            Ok(emeta) => emeta,
                            Err(e) => {
                                debug!("walk: {:?}: metadata: {:?}", path, e);
                                continue;
                            },
                        };
                        let mut mpath = path.clone();
                        mpath.add_slash();
                        mpath.push_segment(&entry.name());
                        mpath.add_slash_if(emeta.is_dir());
                        members.push((mpath, level + 1, Some(emeta)));
                    }
                },
                Err(e) => debug!("walk: {:?}: {:?}", path, e),
            }
            // reversed, so the first member is popped first.
            pending.extend(members.into_iter().rev());
        }

        Some((Ok(DavResource::new(path, Some(meta))), pending))
    })
    .boxed()
}
