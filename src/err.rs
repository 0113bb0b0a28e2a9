// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use serde::Serializer;
use serde::ser::SerializeSeq;
use serde_derive::Serialize;
use std::error::Error as StdError;
use std::fmt::{Display, self};

#[derive(Debug, Serialize)]
pub struct Error {
    kind: ErrorKind,
    #[serde(serialize_with = "serialize_cause")]
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new<E>(kind: ErrorKind, cause: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let cause = Some(cause.into());
        Error {kind, cause}
    }

    pub fn kind(&self) -> &ErrorKind {&self.kind}
}

/// Why a geocoding operation failed.
///
/// Kinds raised by the remote service are grouped by
/// [`ErrorKind::is_service_error`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ErrorKind {
    Configuration,
    InvalidArgument,
    Service,
    Query,
    QuotaExceeded,
    RateLimited {
        /// Seconds to wait before the next request, if the service said so.
        retry_after: Option<u64>,
    },
    AuthenticationFailure,
    InsufficientPrivileges,
    TimedOut,
    Unavailable,
    Parse,
    NotFound,
    Unsupported,
}

impl ErrorKind {
    pub fn is_service_error(&self) -> bool {
        match self {
            ErrorKind::Configuration
            | ErrorKind::InvalidArgument
            | ErrorKind::NotFound
            | ErrorKind::Unsupported => false,
            _ => true,
        }
    }

    /// Classifies a non-successful HTTP status returned by a vendor.
    pub(crate) fn from_status(status: u16, retry_after: Option<u64>) -> Self {
        match status {
            400 | 412 | 413 | 414 => ErrorKind::Query,
            401 | 407 => ErrorKind::AuthenticationFailure,
            402 => ErrorKind::QuotaExceeded,
            403 => ErrorKind::InsufficientPrivileges,
            429 => ErrorKind::RateLimited {retry_after},
            503 => ErrorKind::Unavailable,
            504 => ErrorKind::TimedOut,
            _ => ErrorKind::Service,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Configuration => f.write_str("Bad geocoder configuration"),
            ErrorKind::InvalidArgument => f.write_str("Invalid argument"),
            ErrorKind::Service => f.write_str("Geocoder service error"),
            ErrorKind::Query => f.write_str("Query rejected by geocoder"),
            ErrorKind::QuotaExceeded => f.write_str("Geocoder quota exceeded"),
            ErrorKind::RateLimited {retry_after: Some(secs)} =>
                write!(f, "Rate limited, retry after {}s", secs),
            ErrorKind::RateLimited {retry_after: None} => f.write_str("Rate limited"),
            ErrorKind::AuthenticationFailure =>
                f.write_str("Geocoder authentication failure"),
            ErrorKind::InsufficientPrivileges =>
                f.write_str("Insufficient privileges"),
            ErrorKind::TimedOut => f.write_str("Geocoder timed out"),
            ErrorKind::Unavailable => f.write_str("Geocoder unavailable"),
            ErrorKind::Parse => f.write_str("Could not parse geocoder response"),
            ErrorKind::NotFound => f.write_str("Not found"),
            ErrorKind::Unsupported => f.write_str("Unsupported operation"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|e| &**e as &dyn StdError)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {kind, cause: None}
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Error {
        let kind = if e.is_connect() {
            ErrorKind::Unavailable
        } else if e.is_timeout() {
            ErrorKind::TimedOut
        } else {
            ErrorKind::Service
        };
        Error::new(kind, e)
    }
}

impl From<native_tls::Error> for Error {
    fn from(e: native_tls::Error) -> Error {
        Error::new(ErrorKind::Configuration, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::new(ErrorKind::Parse, e)
    }
}

fn serialize_cause<S>(e: &Option<Box<dyn StdError + Send + Sync>>, out: S)
    -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = out.serialize_seq(None)?;
    let mut e = e.as_ref().map(|e| &**e as &dyn StdError);
    while let Some(cause) = e {
        seq.serialize_element(&cause.to_string())?;
        e = cause.source();
    }
    seq.end()
}
