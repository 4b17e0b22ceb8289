#![forbid(unsafe_code)]

//! Core: chart entries, list and plot surfaces, row fragments, gestures and
//! viewer state.
//!
//! Nothing in this crate performs I/O. The server owns the authoritative
//! entry list; the client mirrors it through a [`ListSurface`] and only ever
//! mutates that mirror after the server has confirmed the matching change.
//! Driving requests and applying confirmed effects is the job of
//! `chartdeck-runtime`.

pub mod entry;
pub mod fragment;
pub mod gesture;
pub mod role;
pub mod surface;
pub mod viewer;

pub use entry::{ChartType, ChartTypeCatalog, Entry, EntryError, EntryList, MoveDirection};
pub use fragment::{EMPTY_STATE_HTML, ScannedFragment, ScannedRow};
pub use gesture::{Gesture, UploadFile};
pub use role::{DomEvent, Role};
pub use surface::{ListSurface, MemoryListSurface, MemoryPlotSurface, PlotSurface, SurfaceError};
pub use viewer::ViewerState;
