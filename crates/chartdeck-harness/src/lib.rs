#![forbid(unsafe_code)]

//! End-to-end test tooling for ChartDeck.
//!
//! - [`FakeServer`]: in-memory authoritative list answering the client
//!   endpoints, with per-path fault injection.
//! - [`LoopbackTransport`]: hands requests to the server at send time and
//!   holds the answers until the test delivers them, in any order.
//! - [`Session`]: a runtime over in-memory surfaces wired to both.
//! - [`script`]: line-based session scripts replayed to JSONL, used by the
//!   `chartdeck-replay` binary.
//!
//! # Quick Start
//!
//! ```ignore
//! use chartdeck_harness::Session;
//!
//! let mut session = Session::with_titles(&["A", "B", "C"]);
//! session.move_up("B");
//! assert_eq!(session.rows(), ["A", "B", "C"]); // not confirmed yet
//! session.settle();
//! assert_eq!(session.rows(), ["B", "A", "C"]);
//! ```

pub mod loopback;
pub mod script;
pub mod server;
pub mod session;

pub use loopback::{LoopbackTransport, SharedServer};
pub use server::{FakeServer, Fault};
pub use session::Session;
