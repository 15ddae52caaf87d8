use std::error::Error;
use std::io::ErrorKind;

use http::StatusCode;

use crate::davpath::ParseError;
use crate::fs::FsError;

#[derive(Debug)]
pub(crate) enum DavError {
    NotFound,                          // request target or source missing
    Forbidden,                         // access denied or source == destination
    MethodNotAllowed,                  // method not in the allow-list, or not applicable
    InvalidHeaderValue(&'static str),  // malformed Depth/Overwrite/Destination
    MissingDestination,                // COPY/MOVE without Destination
    Conflict,                          // intermediate collection missing
    PreconditionFailed,                // conditional headers or Overwrite: F
    NotModified,                       // conditional GET/HEAD
    UnsupportedMediaType,              // MKCOL with a body
    BadGateway,                        // destination on another server/prefix
    NotImplemented,                    // LOCK/UNLOCK/PROPPATCH
    XmlReadError,                      // error reading/parsing xml
    XmlParseError,                     // error interpreting xml
    XmlWriteError,                     // error generating xml
    InvalidPath,                       // error parsing path
    IllegalPath,                       // path not valid here
    ForbiddenPath,                     // too many dotdots
    Status(StatusCode),
    FsError(FsError),
    IoError(std::io::Error),
}

pub(crate) type DavResult<T> = Result<T, DavError>;

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::FsError(e) => Some(e),
            DavError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for DavError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DavError::InvalidHeaderValue(h) => write!(f, "invalid {} header", h),
            DavError::MissingDestination => write!(f, "missing Destination header"),
            DavError::XmlReadError => write!(f, "XML parse error"),
            DavError::XmlWriteError => write!(f, "XML generate error"),
            DavError::FsError(e) => write!(f, "filesystem error: {}", e),
            DavError::IoError(_) => write!(f, "I/O error"),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::FsError(e)
    }
}

impl From<ParseError> for DavError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::InvalidPath => DavError::InvalidPath,
            ParseError::PrefixMismatch => DavError::IllegalPath,
            ParseError::ForbiddenPath => DavError::ForbiddenPath,
        }
    }
}

impl From<xml::writer::Error> for DavError {
    fn from(_e: xml::writer::Error) -> Self {
        DavError::XmlWriteError
    }
}

impl From<DavError> for std::io::Error {
    fn from(e: DavError) -> Self {
        match e {
            DavError::IoError(e) => e,
            e => std::io::Error::new(ErrorKind::Other, e),
        }
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        DavError::IoError(e)
    }
}

pub(crate) fn ioerror_to_status(ioerror: &std::io::Error) -> StatusCode {
    match ioerror.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn fserror_to_status(e: &FsError) -> StatusCode {
    match e {
        FsError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        FsError::GeneralFailure => StatusCode::INTERNAL_SERVER_ERROR,
        FsError::Exists => StatusCode::METHOD_NOT_ALLOWED,
        FsError::NotFound => StatusCode::NOT_FOUND,
        FsError::Forbidden => StatusCode::FORBIDDEN,
        FsError::Conflict => StatusCode::CONFLICT,
        FsError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
        FsError::LoopDetected => StatusCode::LOOP_DETECTED,
        FsError::PathTooLong => StatusCode::URI_TOO_LONG,
        FsError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        FsError::IsRemote => StatusCode::BAD_GATEWAY,
    }
}

impl DavError {
    pub(crate) fn statuscode(&self) -> StatusCode {
        match self {
            DavError::NotFound => StatusCode::NOT_FOUND,
            DavError::Forbidden => StatusCode::FORBIDDEN,
            DavError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            DavError::InvalidHeaderValue(_) => StatusCode::BAD_REQUEST,
            DavError::MissingDestination => StatusCode::BAD_REQUEST,
            DavError::Conflict => StatusCode::CONFLICT,
            DavError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            DavError::NotModified => StatusCode::NOT_MODIFIED,
            DavError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DavError::BadGateway => StatusCode::BAD_GATEWAY,
            DavError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            DavError::XmlReadError => StatusCode::BAD_REQUEST,
            DavError::XmlParseError => StatusCode::BAD_REQUEST,
            DavError::XmlWriteError => StatusCode::INTERNAL_SERVER_ERROR,
            DavError::InvalidPath => StatusCode::BAD_REQUEST,
            DavError::IllegalPath => StatusCode::BAD_GATEWAY,
            DavError::ForbiddenPath => StatusCode::FORBIDDEN,
            DavError::IoError(e) => ioerror_to_status(e),
            DavError::FsError(e) => fserror_to_status(e),
            DavError::Status(e) => *e,
        }
    }
}
