#![forbid(unsafe_code)]

//! Pessimistic mutation controller and host-driven runtime for ChartDeck.
//!
//! # Role in ChartDeck
//! `chartdeck-runtime` turns user gestures into server requests and applies
//! the confirmed effects to the list and plot surfaces from
//! `chartdeck-core`. Nothing is changed on the page until the server answers
//! with success; every failure becomes a transient notice instead.
//!
//! # Key pieces
//! - [`Controller`]: update loop mapping [`Msg`] to [`Cmd`].
//! - [`Runtime`]: owns a controller and a [`Transport`]; the host calls
//!   [`Runtime::dispatch`], [`Runtime::step`] and [`Runtime::advance_time`].
//! - [`ClientConfig`]: endpoints, timeout, in-flight policy, notice settings.
//! - [`QueuedTransport`]: answers requests only when told to; used by tests.
//!
//! # Logging
//! Events and spans go through `tracing`. Enable the `subscriber` feature and
//! call [`logging::install`] to print them on native hosts.

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
#[cfg(feature = "subscriber")]
pub mod logging;
pub mod notice;
pub mod program;
pub mod protocol;
pub mod runtime;
pub mod transport;

pub use clock::HostClock;
pub use config::{ClientConfig, ConfigError, InflightPolicy, LogConfig};
pub use error::GestureError;
pub use guard::{Admission, InFlightGuard};
pub use notice::{Notice, NoticeId, NoticeLevel, NoticeQueue};
pub use program::{Cmd, Controller, Msg, Mutation, Pending, Ticket};
pub use protocol::{Body, Endpoints, HttpRequest, HttpResponse};
pub use runtime::{Runtime, StepResult};
pub use transport::{
    Completion, QueuedTransport, Transport, TransportError, TransportOutcome,
};
