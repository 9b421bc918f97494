use std::error::Error;
use std::io::{self, ErrorKind};

use http::StatusCode;
use xml::writer::Error as XmlWError;

use crate::fs::FsError;

pub(crate) type DavResult<T> = Result<T, DavError>;

#[derive(Debug)]
pub(crate) enum DavError {
    XmlWriterError(XmlWError),
    InvalidPath,
    IllegalPath,
    ForbiddenPath,
    UnknownDavMethod,
    Status(StatusCode),
    StatusClose(StatusCode),
    FsError(FsError),
    IoError(io::Error),
}

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::XmlWriterError(e) => Some(e),
            DavError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for DavError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DavError::XmlWriterError(_) => write!(f, "XML generate error"),
            DavError::FsError(e) => write!(f, "filesystem error: {e}"),
            DavError::IoError(e) => write!(f, "I/O error: {e}"),
            _ => write!(f, "{self:?}"),
        }
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::FsError(e)
    }
}

impl From<DavError> for io::Error {
    fn from(e: DavError) -> Self {
        match e {
            DavError::IoError(e) => e,
            DavError::FsError(e) => e.into(),
            _ => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        fserror_to_ioerror(e)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::IoError(e)
    }
}

impl From<StatusCode> for DavError {
    fn from(e: StatusCode) -> Self {
        DavError::Status(e)
    }
}

impl From<XmlWError> for DavError {
    fn from(e: XmlWError) -> Self {
        DavError::XmlWriterError(e)
    }
}

fn fserror_to_ioerror(e: FsError) -> io::Error {
    match e {
        FsError::NotImplemented => io::Error::new(io::ErrorKind::Other, "NotImplemented"),
        FsError::GeneralFailure => io::Error::new(io::ErrorKind::Other, "GeneralFailure"),
        FsError::Exists => io::Error::new(io::ErrorKind::AlreadyExists, "Exists"),
        FsError::NotFound => io::Error::new(io::ErrorKind::NotFound, "Notfound"),
        FsError::Forbidden => io::Error::new(io::ErrorKind::PermissionDenied, "Forbidden"),
    }
}

pub(crate) fn ioerror_to_status(ioerror: &io::Error) -> StatusCode {
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
    }
}

impl DavError {
    pub(crate) fn statuscode(&self) -> StatusCode {
        match self {
            DavError::XmlWriterError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // a path that is outside the mount, or that cannot be mapped
            // onto the store, is answered like a missing resource.
            DavError::InvalidPath => StatusCode::NOT_FOUND,
            DavError::IllegalPath => StatusCode::NOT_FOUND,
            DavError::ForbiddenPath => StatusCode::NOT_FOUND,
            DavError::UnknownDavMethod => StatusCode::NOT_FOUND,
            DavError::Status(e) => *e,
            DavError::StatusClose(e) => *e,
            DavError::FsError(e) => fserror_to_status(e),
            DavError::IoError(e) => ioerror_to_status(e),
        }
    }

    pub(crate) fn must_close(&self) -> bool {
        !matches!(
            self,
            &DavError::Status(_)
                | &DavError::FsError(FsError::NotFound)
                | &DavError::FsError(FsError::Exists)
                | &DavError::InvalidPath
                | &DavError::UnknownDavMethod
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_errors_map_to_not_found() {
        assert_eq!(DavError::InvalidPath.statuscode(), StatusCode::NOT_FOUND);
        assert_eq!(DavError::ForbiddenPath.statuscode(), StatusCode::NOT_FOUND);
        assert_eq!(DavError::UnknownDavMethod.statuscode(), StatusCode::NOT_FOUND);
        assert!(!DavError::InvalidPath.must_close());
    }

    #[test]
    fn fs_errors() {
        let e: DavError = FsError::Exists.into();
        assert_eq!(e.statuscode(), StatusCode::METHOD_NOT_ALLOWED);
        let e: DavError = FsError::GeneralFailure.into();
        assert_eq!(e.statuscode(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.must_close());
    }
}
