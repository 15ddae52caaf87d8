//! Contains the structs and traits that define a property store.
//!
//! PROPFIND answers are produced by the property store: for each resource
//! the dispatcher hands over what the client asked for and gets back the
//! properties grouped by status.
use dyn_clone::{DynClone, clone_trait_object};
use futures_util::future;
use http::StatusCode;
use xmltree::{Element, XMLNode};

use crate::davpath::DavPath;
use crate::fs::FsFuture;
use crate::httpdate;
use crate::resource::DavResource;
use crate::xmltree_ext::{ElementExt, NS_DAV_URI};

/// Name of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropName {
    pub namespace: Option<String>,
    pub name:      String,
}

impl PropName {
    pub fn new(namespace: Option<&str>, name: &str) -> PropName {
        PropName {
            namespace: namespace.map(|s| s.to_string()),
            name:      name.to_string(),
        }
    }

    /// A property in the `DAV:` namespace.
    pub fn dav(name: &str) -> PropName {
        PropName::new(Some(NS_DAV_URI), name)
    }

    pub fn from_element(e: &Element) -> PropName {
        PropName {
            namespace: e.namespace.clone(),
            name:      e.name.clone(),
        }
    }

    pub fn is_dav(&self) -> bool {
        self.namespace.as_deref() == Some(NS_DAV_URI)
    }

    pub(crate) fn matches(&self, e: &Element) -> bool {
        self.name == e.name && self.namespace == e.namespace
    }

    /// Empty element for this property. `DAV:` properties use the `D`
    /// prefix bound on the multistatus root, others declare their
    /// namespace as the default namespace of the element.
    pub fn to_element(&self) -> Element {
        if self.is_dav() {
            return Element::new2(format!("D:{}", self.name).as_str());
        }
        let mut e = Element::new(&self.name);
        e.namespace = self.namespace.clone();
        e
    }
}

/// What a PROPFIND asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum PropRequest {
    /// All properties with their values.
    AllProp,
    /// Names of all properties, without values.
    PropName,
    /// The listed properties.
    Prop(Vec<PropName>),
}

/// A group of properties sharing one status.
#[derive(Debug, Clone)]
pub struct PropStat {
    pub status: StatusCode,
    pub props:  Vec<Element>,
}

/// The property store.
pub trait DavPropStore: Send + Sync + DynClone {
    /// Properties of `res`, grouped by status.
    fn propstat<'a>(&'a self, res: &'a DavResource, req: &'a PropRequest) -> FsFuture<'a, Vec<PropStat>>;

    /// Forget all properties at and below `path`.
    fn remove_all<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;

    /// Copy the properties at and below `from` to `to`. With `is_move`
    /// the originals are removed.
    fn copy_all<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, is_move: bool) -> FsFuture<'a, ()>;
}

clone_trait_object! {DavPropStore}

/// Property store without dead properties. Reports the live
/// properties that follow from the resource metadata.
#[derive(Debug, Clone, Default)]
pub struct LiveProps;

impl LiveProps {
    pub fn new() -> Box<LiveProps> {
        Box::new(LiveProps)
    }
}

impl DavPropStore for LiveProps {
    fn propstat<'a>(&'a self, res: &'a DavResource, req: &'a PropRequest) -> FsFuture<'a, Vec<PropStat>> {
        Box::pin(future::ready(Ok(collect_propstat(res, req, &[]))))
    }

    fn remove_all<'a>(&'a self, _path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(future::ready(Ok(())))
    }

    fn copy_all<'a>(&'a self, _from: &'a DavPath, _to: &'a DavPath, _is_move: bool) -> FsFuture<'a, ()> {
        Box::pin(future::ready(Ok(())))
    }
}

const LIVE_PROPS: &[&str] = &[
    "creationdate",
    "displayname",
    "getcontentlength",
    "getcontenttype",
    "getetag",
    "getlastmodified",
    "resourcetype",
];

// value of a live property, None if the resource does not have it.
fn live_prop(res: &DavResource, name: &str) -> Option<Element> {
    let meta = res.metadata()?;
    let text = |s: String| Some(Element::new_text(format!("D:{}", name).as_str(), s));
    match name {
        "creationdate" => text(httpdate::systemtime_to_rfc3339(meta.created().ok()?)),
        "displayname" => text(res.name()),
        "getcontentlength" if !meta.is_dir() => text(meta.len().to_string()),
        "getcontenttype" if !meta.is_dir() => text(res.path().get_mime_type_str().to_string()),
        "getetag" => text(format!("\"{}\"", meta.etag()?)),
        "getlastmodified" => text(httpdate::systemtime_to_httpdate(meta.modified().ok()?)),
        "resourcetype" => {
            let mut e = Element::new2("D:resourcetype");
            if meta.is_dir() {
                e.push_element(Element::new2("D:collection"));
            }
            Some(e)
        },
        _ => None,
    }
}

fn strip_value(e: &Element) -> Element {
    let mut e = e.clone();
    e.children.retain(|n| !matches!(n, XMLNode::Text(_) | XMLNode::Element(_) | XMLNode::CData(_)));
    e
}

/// Build the propstat groups for `res` from its live properties and
/// the given dead properties.
pub(crate) fn collect_propstat(res: &DavResource, req: &PropRequest, dead: &[Element]) -> Vec<PropStat> {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    match req {
        PropRequest::AllProp => {
            found.extend(LIVE_PROPS.iter().filter_map(|n| live_prop(res, n)));
            found.extend(dead.iter().cloned());
        },
        PropRequest::PropName => {
            found.extend(LIVE_PROPS.iter().filter_map(|n| live_prop(res, n)).map(|e| strip_value(&e)));
            found.extend(dead.iter().map(strip_value));
        },
        PropRequest::Prop(names) => {
            for name in names {
                let value = if name.is_dav() {
                    live_prop(res, &name.name)
                } else {
                    None
                };
                match value.or_else(|| dead.iter().find(|e| name.matches(e)).cloned()) {
                    Some(e) => found.push(e),
                    None => missing.push(name.to_element()),
                }
            }
        },
    }

    let mut propstats = Vec::new();
    if !found.is_empty() {
        propstats.push(PropStat {
            status: StatusCode::OK,
            props:  found,
        });
    }
    if !missing.is_empty() {
        propstats.push(PropStat {
            status: StatusCode::NOT_FOUND,
            props:  missing,
        });
    }
    propstats
}
