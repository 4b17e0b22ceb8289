#![forbid(unsafe_code)]

//! Gesture failure taxonomy.
//!
//! Every variant degrades to "no DOM change"; the runtime turns it into a
//! notice so the user sees that nothing happened.

use std::fmt;
use std::time::Duration;

use chartdeck_core::SurfaceError;

use crate::notice::NoticeLevel;
use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// No request could be issued on this host.
    TransportUnavailable(String),
    /// The request failed before a status arrived.
    Network(String),
    /// The configured timeout elapsed.
    TimedOut { after: Duration },
    /// Terminal status other than 200.
    Http { status: u16 },
    /// Status 200 but the acknowledgement flag was false or missing.
    ServerRejected { operation: &'static str },
    /// The request body could not be serialized.
    Encode { operation: &'static str, detail: String },
    /// Status 200 but the body could not be decoded.
    MalformedResponse { operation: &'static str, detail: String },
    /// Another change to the same entry is still outstanding.
    Busy { title: String },
    /// The chart type is not in the configured catalogue.
    UnknownChartType { chart_type: String },
    /// A picked file could not be read, so it was never uploaded.
    FileRead { file: String, detail: String },
    /// The confirmed change could not be applied to the page.
    Surface(SurfaceError),
}

impl GestureError {
    /// Notice severity for this failure.
    #[must_use]
    pub const fn level(&self) -> NoticeLevel {
        match self {
            Self::TransportUnavailable(_)
            | Self::Encode { .. }
            | Self::MalformedResponse { .. }
            | Self::FileRead { .. }
            | Self::Surface(_) => NoticeLevel::Error,
            Self::Busy { .. } => NoticeLevel::Info,
            _ => NoticeLevel::Warning,
        }
    }
}

impl fmt::Display for GestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable(why) => write!(f, "cannot reach the server: {why}"),
            Self::Network(why) => write!(f, "request failed: {why}"),
            Self::TimedOut { after } => {
                write!(f, "server did not answer within {} ms", after.as_millis())
            }
            Self::Http { status } => write!(f, "server answered with status {status}"),
            Self::ServerRejected { operation } => write!(f, "server declined the {operation}"),
            Self::Encode { operation, detail } => {
                write!(f, "could not build the {operation} request: {detail}")
            }
            Self::MalformedResponse { operation, detail } => {
                write!(f, "unreadable {operation} response: {detail}")
            }
            Self::Busy { title } => write!(f, "a change to \"{title}\" is still pending"),
            Self::UnknownChartType { chart_type } => {
                write!(f, "\"{chart_type}\" is not an available chart type")
            }
            Self::FileRead { file, detail } => write!(f, "could not read \"{file}\": {detail}"),
            Self::Surface(err) => write!(f, "could not update the page: {err}"),
        }
    }
}

impl std::error::Error for GestureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for GestureError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(why) => Self::TransportUnavailable(why),
            TransportError::Network(why) => Self::Network(why),
            TransportError::TimedOut { after } => Self::TimedOut { after },
        }
    }
}

impl From<SurfaceError> for GestureError {
    fn from(err: SurfaceError) -> Self {
        Self::Surface(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_onto_taxonomy() {
        let err: GestureError = TransportError::Unavailable("no fetch".into()).into();
        assert_eq!(err, GestureError::TransportUnavailable("no fetch".into()));
        assert_eq!(err.level(), NoticeLevel::Error);

        let err: GestureError = TransportError::TimedOut {
            after: Duration::from_millis(1500),
        }
        .into();
        assert_eq!(err.to_string(), "server did not answer within 1500 ms");
        assert_eq!(err.level(), NoticeLevel::Warning);
    }

    #[test]
    fn busy_is_informational() {
        let err = GestureError::Busy { title: "A".into() };
        assert_eq!(err.level(), NoticeLevel::Info);
        assert_eq!(err.to_string(), "a change to \"A\" is still pending");
    }

    #[test]
    fn unreadable_upload_is_an_error() {
        let err = GestureError::FileRead {
            file: "a.csv".into(),
            detail: "NotReadableError".into(),
        };
        assert_eq!(err.level(), NoticeLevel::Error);
        assert_eq!(err.to_string(), "could not read \"a.csv\": NotReadableError");
    }
}
