#![forbid(unsafe_code)]

//! Step-based runtime for a chart list page.
//!
//! [`Runtime`] owns a [`Controller`] and a [`Transport`] and runs without
//! threads or blocking. The host controls the loop:
//!
//! 1. Forward gestures via [`Runtime::dispatch`].
//! 2. Call [`Runtime::step`] whenever a transport completion may have
//!    arrived (the web transport wakes the host for this).
//! 3. Advance time via [`Runtime::advance_time`] so request timeouts and
//!    notice lifetimes elapse.
//!
//! Completions are queued in an inbox shared with the transport's callbacks
//! and applied in arrival order during [`step`](Runtime::step). A request
//! whose timeout elapses is completed with [`TransportError::TimedOut`]; the
//! real answer, if it ever arrives, is then dropped as late.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use chartdeck_core::{Gesture, ListSurface, PlotSurface, ViewerState};
use tracing::{debug, error, info, warn};

use crate::clock::HostClock;
use crate::config::ClientConfig;
use crate::error::GestureError;
use crate::notice::{Notice, NoticeId, NoticeQueue};
use crate::program::{Cmd, Controller, Msg, Ticket};
use crate::protocol::HttpRequest;
use crate::transport::{Completion, Transport, TransportError, TransportOutcome};

type Inbox = Rc<RefCell<VecDeque<(Ticket, TransportOutcome)>>>;

/// Result of a [`Runtime::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepResult {
    /// Completions applied during this step.
    pub completions: u32,
    /// Requests handed to the transport during this step.
    pub requests_issued: u32,
    /// Requests still awaiting a completion.
    pub in_flight: usize,
    /// Whether the notice list changed.
    pub notices_changed: bool,
}

impl StepResult {
    fn absorb(&mut self, other: Self) {
        self.completions += other.completions;
        self.requests_issued += other.requests_issued;
        self.in_flight = other.in_flight;
        self.notices_changed |= other.notices_changed;
    }
}

/// Host-driven runtime.
pub struct Runtime<T, L, P> {
    controller: Controller<L, P>,
    transport: T,
    inbox: Inbox,
    clock: HostClock,
    timeout: Option<Duration>,
    deadlines: BTreeMap<Ticket, Duration>,
    notices: NoticeQueue,
}

impl<T: Transport, L: ListSurface, P: PlotSurface> Runtime<T, L, P> {
    #[must_use]
    pub fn new(list: L, plot: P, transport: T, config: ClientConfig) -> Self {
        let timeout = config.request_timeout();
        let notices = NoticeQueue::new(config.max_notices, config.notice_ttl());
        info!(
            policy = ?config.inflight_policy,
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            "chart list runtime ready"
        );
        Self {
            controller: Controller::new(list, plot, config),
            transport,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            clock: HostClock::new(),
            timeout,
            deadlines: BTreeMap::new(),
            notices,
        }
    }

    /// Handle a user gesture.
    pub fn dispatch(&mut self, gesture: Gesture) -> StepResult {
        let mut result = self.update(Msg::Gesture(gesture));
        result.absorb(self.step());
        result
    }

    /// Return the viewer to its prompt.
    pub fn clear_viewer(&mut self) -> StepResult {
        let mut result = self.update(Msg::ClearViewer);
        result.absorb(self.step());
        result
    }

    /// Apply every completion received so far, in arrival order.
    pub fn step(&mut self) -> StepResult {
        let mut result = StepResult::default();
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            let Some((ticket, outcome)) = next else {
                break;
            };
            self.deadlines.remove(&ticket);
            result.completions += 1;
            result.absorb(self.update(Msg::Completed { ticket, outcome }));
        }
        result.in_flight = self.controller.in_flight();
        result
    }

    /// Advance host time by `dt`, expiring overdue requests and old notices.
    pub fn advance_time(&mut self, dt: Duration) -> StepResult {
        self.clock.advance(dt);
        self.expire_deadlines();
        let expired = self.notices.expire(self.clock.now());
        let mut result = self.step();
        result.notices_changed |= expired > 0;
        result
    }

    /// Raise a notice for a failure the host detected before any gesture
    /// reached the controller, such as an unreadable upload.
    pub fn report(&mut self, err: &GestureError) -> StepResult {
        warn!(error = %err, "gesture failed before dispatch");
        let mut result = StepResult::default();
        self.execute(Cmd::notify(err), &mut result);
        result.in_flight = self.controller.in_flight();
        result
    }

    /// Dismiss a notice before it expires.
    pub fn dismiss_notice(&mut self, id: NoticeId) -> bool {
        self.notices.dismiss(id)
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    #[must_use]
    pub fn controller(&self) -> &Controller<L, P> {
        &self.controller
    }

    #[must_use]
    pub fn list(&self) -> &L {
        self.controller.list()
    }

    pub fn list_mut(&mut self) -> &mut L {
        self.controller.list_mut()
    }

    #[must_use]
    pub fn plot(&self) -> &P {
        self.controller.plot()
    }

    #[must_use]
    pub fn viewer(&self) -> &ViewerState {
        self.controller.viewer()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.controller.in_flight()
    }

    fn update(&mut self, msg: Msg) -> StepResult {
        let cmd = self.controller.update(msg);
        let mut result = StepResult::default();
        self.execute(cmd, &mut result);
        result.in_flight = self.controller.in_flight();
        result
    }

    fn execute(&mut self, cmd: Cmd, result: &mut StepResult) {
        match cmd {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd, result);
                }
            }
            Cmd::Send { ticket, request } => {
                self.send(ticket, request);
                result.requests_issued += 1;
            }
            Cmd::Notify { level, message } => {
                debug!(level = level.as_str(), %message, "notice raised");
                self.notices.push(level, message, self.clock.now());
                result.notices_changed = true;
            }
        }
    }

    fn send(&mut self, ticket: Ticket, request: HttpRequest) {
        let inbox = Rc::clone(&self.inbox);
        let on_complete: Completion = Box::new(move |outcome| {
            inbox.borrow_mut().push_back((ticket, outcome));
        });
        match self.transport.send(request, on_complete) {
            Ok(()) => {
                if let Some(timeout) = self.timeout {
                    let deadline = self.clock.now().saturating_add(timeout);
                    self.deadlines.insert(ticket, deadline);
                }
            }
            Err(err) => {
                error!(%ticket, error = %err, "request not issued");
                self.inbox.borrow_mut().push_back((ticket, Err(err)));
            }
        }
    }

    fn expire_deadlines(&mut self) {
        let Some(after) = self.timeout else {
            return;
        };
        let now = self.clock.now();
        let overdue: Vec<Ticket> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(ticket, _)| *ticket)
            .collect();
        for ticket in overdue {
            self.deadlines.remove(&ticket);
            warn!(%ticket, timeout_ms = after.as_millis() as u64, "request timed out");
            self.inbox
                .borrow_mut()
                .push_back((ticket, Err(TransportError::TimedOut { after })));
        }
    }
}

impl<T, L, P> std::fmt::Debug for Runtime<T, L, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("controller", &self.controller)
            .field("now", &self.clock.now())
            .field("deadlines", &self.deadlines.len())
            .field("notices", &self.notices.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use crate::protocol::HttpResponse;
    use crate::transport::QueuedTransport;
    use chartdeck_core::{
        fragment, ChartTypeCatalog, Entry, MemoryListSurface, MemoryPlotSurface, MoveDirection,
    };
    use pretty_assertions::assert_eq;

    type TestRuntime = Runtime<QueuedTransport, MemoryListSurface, MemoryPlotSurface>;

    fn runtime(titles: &[&str], transport: QueuedTransport, config: ClientConfig) -> TestRuntime {
        let entries: Vec<Entry> = titles.iter().map(|t| Entry::new(*t, "ichart")).collect();
        let html = fragment::render_list(&entries, &ChartTypeCatalog::new(["ichart"]));
        Runtime::new(
            MemoryListSurface::from_html(&html),
            MemoryPlotSurface::new(),
            transport,
            config,
        )
    }

    fn move_up(title: &str) -> Gesture {
        Gesture::Move {
            title: title.into(),
            direction: MoveDirection::Up,
        }
    }

    fn success() -> TransportOutcome {
        Ok(HttpResponse::new(200, r#"{"success":true}"#))
    }

    #[test]
    fn completions_apply_on_step() {
        let mut rt = runtime(&["A", "B"], QueuedTransport::new(), ClientConfig::default());
        let result = rt.dispatch(move_up("B"));
        assert_eq!(result.requests_issued, 1);
        assert_eq!(result.in_flight, 1);

        rt.transport_mut().respond_next(success());
        assert_eq!(rt.list().row_ids(), ["A", "B"]);
        let result = rt.step();
        assert_eq!(result.completions, 1);
        assert_eq!(result.in_flight, 0);
        assert_eq!(rt.list().row_ids(), ["B", "A"]);
    }

    #[test]
    fn unavailable_transport_raises_error_notice() {
        let mut rt = runtime(&["A", "B"], QueuedTransport::unavailable(), ClientConfig::default());
        let before = rt.list().markup();
        let result = rt.dispatch(move_up("B"));
        assert_eq!(result.completions, 1);
        assert!(result.notices_changed);
        assert_eq!(rt.in_flight(), 0);
        assert_eq!(rt.list().markup(), before);
        let notice = rt.notices().last().cloned().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("cannot reach the server"));
    }

    #[test]
    fn timeout_completes_request_and_drops_late_answer() {
        let config = ClientConfig {
            request_timeout_ms: Some(1_000),
            ..ClientConfig::default()
        };
        let mut rt = runtime(&["A", "B"], QueuedTransport::new(), config);
        rt.dispatch(move_up("B"));

        assert_eq!(rt.advance_time(Duration::from_millis(999)).completions, 0);
        let result = rt.advance_time(Duration::from_millis(1));
        assert_eq!(result.completions, 1);
        assert_eq!(result.in_flight, 0);
        assert_eq!(
            rt.notices().last().map(|n| n.message.clone()),
            Some("server did not answer within 1000 ms".to_string())
        );

        rt.transport_mut().respond_next(success());
        assert_eq!(rt.step().completions, 1);
        assert_eq!(rt.list().row_ids(), ["A", "B"]);
    }

    #[test]
    fn notices_expire_with_host_time() {
        let mut rt = runtime(&["A", "B"], QueuedTransport::unavailable(), ClientConfig::default());
        rt.dispatch(move_up("B"));
        assert_eq!(rt.notices().count(), 1);
        let result = rt.advance_time(Duration::from_secs(4));
        assert!(result.notices_changed);
        assert_eq!(rt.notices().count(), 0);
    }

    #[test]
    fn notices_can_be_dismissed() {
        let mut rt = runtime(&["A", "B"], QueuedTransport::unavailable(), ClientConfig::default());
        rt.dispatch(move_up("B"));
        let id = rt.notices().next().map(|n| n.id).unwrap();
        assert!(rt.dismiss_notice(id));
        assert_eq!(rt.notices().count(), 0);
    }

    #[test]
    fn reported_failures_become_notices_without_requests() {
        let mut rt = runtime(&["A"], QueuedTransport::new(), ClientConfig::default());
        let before = rt.list().markup();
        let result = rt.report(&GestureError::FileRead {
            file: "b.csv".into(),
            detail: "NotReadableError".into(),
        });
        assert!(result.notices_changed);
        assert_eq!(result.requests_issued, 0);
        assert_eq!(rt.in_flight(), 0);
        assert_eq!(rt.list().markup(), before);
        let notice = rt.notices().last().cloned().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "could not read \"b.csv\": NotReadableError");
    }

    #[test]
    fn clear_viewer_resets_plot() {
        let mut rt = runtime(&["A"], QueuedTransport::new(), ClientConfig::default());
        rt.dispatch(Gesture::Select { title: "A".into() });
        rt.transport_mut().respond_next(Ok(HttpResponse::new(
            200,
            r#"{"chartTitle":"A","chartPlotUrl":"/A_ichart.png"}"#,
        )));
        rt.step();
        assert_eq!(rt.viewer().title(), Some("A"));
        rt.clear_viewer();
        assert_eq!(rt.viewer(), &ViewerState::Blank);
        assert_eq!(rt.plot().plot_url(), None);
    }
}
