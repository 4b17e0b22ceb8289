#![forbid(unsafe_code)]

//! End-to-end session: a runtime wired to a [`FakeServer`] through a
//! [`LoopbackTransport`], with in-memory page surfaces.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chartdeck_core::{
    ChartType, ChartTypeCatalog, Gesture, ListSurface, MemoryListSurface, MemoryPlotSurface,
    MoveDirection, UploadFile, ViewerState,
};
use chartdeck_runtime::{ClientConfig, Notice, Runtime, StepResult};

use crate::loopback::{LoopbackTransport, SharedServer};
use crate::server::FakeServer;

pub type SessionRuntime = Runtime<LoopbackTransport, MemoryListSurface, MemoryPlotSurface>;

pub struct Session {
    runtime: SessionRuntime,
    server: SharedServer,
}

impl Session {
    /// Start from the page the server would render for its current list.
    #[must_use]
    pub fn new(server: FakeServer, config: ClientConfig) -> Self {
        let list = MemoryListSurface::from_html(&server.render());
        let server = Rc::new(RefCell::new(server));
        let transport = LoopbackTransport::new(Rc::clone(&server));
        Self {
            runtime: Runtime::new(list, MemoryPlotSurface::new(), transport, config),
            server,
        }
    }

    /// A session over `titles` with the `ichart`/`xbar` catalogue.
    #[must_use]
    pub fn with_titles(titles: &[&str]) -> Self {
        Self::with_titles_and_config(titles, ClientConfig::default())
    }

    #[must_use]
    pub fn with_titles_and_config(titles: &[&str], config: ClientConfig) -> Self {
        let catalog = ChartTypeCatalog::new(["ichart", "xbar"]);
        Self::new(FakeServer::with_titles(catalog, titles.iter().copied()), config)
    }

    pub fn dispatch(&mut self, gesture: Gesture) -> StepResult {
        self.runtime.dispatch(gesture)
    }

    pub fn move_up(&mut self, title: &str) -> StepResult {
        self.dispatch(Gesture::Move {
            title: title.into(),
            direction: MoveDirection::Up,
        })
    }

    pub fn move_down(&mut self, title: &str) -> StepResult {
        self.dispatch(Gesture::Move {
            title: title.into(),
            direction: MoveDirection::Down,
        })
    }

    pub fn delete(&mut self, title: &str) -> StepResult {
        self.dispatch(Gesture::Delete {
            title: title.into(),
        })
    }

    pub fn select(&mut self, title: &str) -> StepResult {
        self.dispatch(Gesture::Select {
            title: title.into(),
        })
    }

    /// Pick `chart_type` in the row's control, which fires the change.
    pub fn set_chart_type(&mut self, title: &str, chart_type: &str) -> StepResult {
        // Rows that are not shown have no control to pick from.
        let _ = self.runtime.list_mut().pick(title, chart_type);
        self.dispatch(Gesture::SetChartType {
            title: title.into(),
            chart_type: ChartType::new(chart_type),
        })
    }

    pub fn upload<I, S>(&mut self, file_names: I) -> StepResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files = file_names
            .into_iter()
            .map(|name| UploadFile::new(name, Vec::new()))
            .collect();
        self.dispatch(Gesture::Upload(files))
    }

    pub fn clear_viewer(&mut self) -> StepResult {
        self.runtime.clear_viewer()
    }

    /// Deliver the oldest pending answer and apply it.
    pub fn deliver_next(&mut self) -> StepResult {
        self.runtime.transport_mut().deliver_next();
        self.runtime.step()
    }

    /// Deliver the pending answer at `index`, oldest first, and apply it.
    pub fn deliver(&mut self, index: usize) -> StepResult {
        self.runtime.transport_mut().deliver(index);
        self.runtime.step()
    }

    /// Deliver the newest pending answer and apply it.
    pub fn deliver_last(&mut self) -> StepResult {
        self.runtime.transport_mut().deliver_last();
        self.runtime.step()
    }

    /// Deliver every pending answer, including follow-up requests issued
    /// while applying them, until nothing is pending.
    pub fn settle(&mut self) -> StepResult {
        let mut total = StepResult::default();
        while self.runtime.transport().pending_len() > 0 {
            self.runtime.transport_mut().deliver_all();
            let step = self.runtime.step();
            total.completions += step.completions;
            total.requests_issued += step.requests_issued;
            total.notices_changed |= step.notices_changed;
            total.in_flight = step.in_flight;
        }
        total
    }

    pub fn advance_time(&mut self, dt: Duration) -> StepResult {
        self.runtime.advance_time(dt)
    }

    #[must_use]
    pub fn runtime(&self) -> &SessionRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut SessionRuntime {
        &mut self.runtime
    }

    #[must_use]
    pub fn server(&self) -> &SharedServer {
        &self.server
    }

    /// Row ids currently rendered, top to bottom.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.runtime.list().row_ids()
    }

    #[must_use]
    pub fn server_titles(&self) -> Vec<String> {
        self.server.borrow().titles()
    }

    /// Whether the rendered rows match the server's order.
    #[must_use]
    pub fn in_sync(&self) -> bool {
        self.rows() == self.server_titles()
    }

    /// Value shown by the row's type control.
    #[must_use]
    pub fn control_value(&self, title: &str) -> Option<String> {
        self.runtime.list().control_value(title)
    }

    /// Whether every row's type control shows the server's type.
    #[must_use]
    pub fn chart_types_in_sync(&self) -> bool {
        let server = self.server.borrow();
        self.rows().iter().all(|title| {
            server.entries().get(title).map(|e| e.chart_type.to_string())
                == self.control_value(title)
        })
    }

    #[must_use]
    pub fn markup(&self) -> String {
        self.runtime.list().markup()
    }

    #[must_use]
    pub fn shows_placeholder(&self) -> bool {
        self.runtime.list().is_showing_empty_state()
    }

    #[must_use]
    pub fn viewer(&self) -> &ViewerState {
        self.runtime.viewer()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.runtime.notices().cloned().collect()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.runtime.transport().pending_len()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("rows", &self.rows())
            .field("server", &self.server_titles())
            .field("viewer", self.viewer())
            .finish()
    }
}
