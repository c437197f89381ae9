//! Courier tracking errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type returned by tracking and dispatch components.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The request payload is invalid or missing required fields.
    #[error("code: 400, description: {0}")]
    BadRequest(String),

    /// The requested resource could not be found.
    #[error("code: 404, description: {0}")]
    NotFound(String),

    /// A non recoverable internal error occurred.
    #[error("code: 500, description: {0}")]
    Internal(String),

    /// The remote tracking service failed while fulfilling the request.
    #[error("code: 502, description: {0}")]
    BadGateway(String),

    /// A payload could not be decoded.
    #[error("code: 500, description: invalid_format {0}")]
    InvalidFormat(String),

    /// A payload is missing a required field.
    #[error("code: 500, description: missing_field {0}")]
    MissingField(String),

    /// The device refused access to its position.
    #[error("code: 403, description: permission_denied {0}")]
    PermissionDenied(String),

    /// The device could not produce a position.
    #[error("code: 503, description: unavailable {0}")]
    Unavailable(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::BadRequest(_s) => Self::BadRequest(chain),
                Self::NotFound(_s) => Self::NotFound(chain),
                Self::BadGateway(_s) => Self::BadGateway(chain),
                Self::Internal(_s) => Self::Internal(chain),
                Self::InvalidFormat(e) => Self::InvalidFormat(format!("{err}: {e}")),
                Self::MissingField(e) => Self::MissingField(format!("{err}: {e}")),
                Self::PermissionDenied(e) => Self::PermissionDenied(format!("{err}: {e}")),
                Self::Unavailable(e) => Self::Unavailable(format!("{err}: {e}")),
            };
        }

        // otherwise, return an Internal error
        Self::Internal(chain)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

#[macro_export]
macro_rules! bad_request {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::BadRequest(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::BadRequest(format!($err))
    };
}

#[macro_export]
macro_rules! not_found {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::NotFound(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::NotFound(format!($err))
    };
}

#[macro_export]
macro_rules! bad_gateway {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::BadGateway(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::BadGateway(format!($err))
    };
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result, anyhow};
    use serde_json::Value;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry, fmt};

    use http::StatusCode;

    use super::Error;

    #[test]
    fn error_display() {
        let err = Error::BadRequest("invalid input".to_string());
        assert_eq!(format!("{err}",), "code: 400, description: invalid input");
    }

    #[test]
    fn with_context() {
        Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).init();

        let context_error = || -> Result<(), Error> {
            Err(Error::BadGateway("track rejected".to_string()))
                .context("publishing sample")
                .context("delivery 42")?;
            Ok(())
        };

        let result = context_error();
        assert_eq!(
            result.unwrap_err(),
            Error::BadGateway(
                "delivery 42 -> publishing sample -> code: 502, description: track rejected"
                    .to_string()
            )
        );
    }

    #[test]
    fn permission_context() {
        let result = Err::<(), Error>(Error::PermissionDenied("user blocked location".to_string()))
            .context("starting watch");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            "code: 403, description: permission_denied starting watch: user blocked location"
        );
        assert_eq!(err.code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("one-off error")).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.to_string(), "code: 500, description: error context -> one-off error");
        assert_eq!(err.code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn serde_context() {
        let result: Result<Value, anyhow::Error> =
            serde_json::from_str(r#"{"foo": "bar""#).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            "code: 500, description: error context -> EOF while parsing an object at line 1 column 13"
        );
    }

    #[test]
    fn macros() {
        let id = "p-1";
        assert_eq!(crate::not_found!("parcel {}", id), Error::NotFound("parcel p-1".to_string()));
        assert_eq!(crate::bad_request!("empty {}", "id").code(), http::StatusCode::BAD_REQUEST);
    }
}
