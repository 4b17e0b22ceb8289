#![forbid(unsafe_code)]

//! Pessimistic mutation controller.
//!
//! The [`Controller`] follows an update/command loop: the host feeds it a
//! [`Msg`] (a user gesture, a request completion, or a viewer reset), the
//! controller mutates its surfaces only when a completion confirms success,
//! and returns a [`Cmd`] describing requests to issue and notices to raise.
//!
//! The controller never performs I/O itself. Each request it wants issued is
//! tagged with a [`Ticket`]; the host hands the eventual outcome back as
//! [`Msg::Completed`] with the same ticket. A ticket that is no longer
//! pending (already completed, or timed out) is ignored.
//!
//! # Invariants
//!
//! - Failed gestures leave both surfaces untouched.
//! - A confirmed move swaps the entry with the neighbor it had when the
//!   request was issued, and only while the two rows are still adjacent in
//!   that order. A replacement fragment that already reflects the move
//!   leaves nothing to swap.
//! - A type control shows the confirmed chart type once its change has
//!   completed or been refused.
//! - The list shows rows or the empty-state placeholder, never both.
//! - The viewer changes only on a confirmed selection or [`Msg::ClearViewer`].

use std::collections::HashMap;
use std::fmt;

use chartdeck_core::{
    ChartType, Gesture, ListSurface, MoveDirection, PlotSurface, SurfaceError, UploadFile,
    ViewerState,
};
use serde::de::DeserializeOwned;
use tracing::{debug, debug_span, error, warn};

use crate::config::ClientConfig;
use crate::error::GestureError;
use crate::guard::{Admission, InFlightGuard};
use crate::notice::NoticeLevel;
use crate::protocol::{
    AckResponse, ChartTitleRequest, HttpRequest, HttpResponse, MoveChartRequest,
    SetChartTypeRequest, SetChartTypeResponse, ShowChartResponse,
};
use crate::transport::TransportOutcome;

/// Correlates a request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input to [`Controller::update`].
#[derive(Debug)]
pub enum Msg {
    Gesture(Gesture),
    /// Terminal outcome of the request issued under `ticket`.
    Completed {
        ticket: Ticket,
        outcome: TransportOutcome,
    },
    /// Return the viewer to its prompt.
    ClearViewer,
}

impl From<Gesture> for Msg {
    fn from(gesture: Gesture) -> Self {
        Self::Gesture(gesture)
    }
}

/// Work the host should carry out after an update.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum Cmd {
    #[default]
    None,
    /// Several commands, run in order.
    Batch(Vec<Cmd>),
    /// Issue `request` and report its outcome under `ticket`.
    Send { ticket: Ticket, request: HttpRequest },
    /// Raise a notice.
    Notify { level: NoticeLevel, message: String },
}

impl Cmd {
    /// Collapse a list of commands, dropping no-ops.
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    /// Notice for a failed gesture.
    #[must_use]
    pub fn notify(err: &GestureError) -> Self {
        Self::Notify {
            level: err.level(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Requests carried by this command, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<(Ticket, &HttpRequest)> {
        let mut out = Vec::new();
        self.collect_requests(&mut out);
        out
    }

    fn collect_requests<'a>(&'a self, out: &mut Vec<(Ticket, &'a HttpRequest)>) {
        match self {
            Self::Send { ticket, request } => out.push((*ticket, request)),
            Self::Batch(cmds) => cmds.iter().for_each(|c| c.collect_requests(out)),
            Self::None | Self::Notify { .. } => {}
        }
    }
}

/// A list mutation subject to the in-flight guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetChartType { title: String, chart_type: ChartType },
    /// `neighbor` is the row the entry trades places with, as rendered when
    /// the request was issued.
    Move {
        title: String,
        direction: MoveDirection,
        neighbor: String,
    },
    Delete { title: String },
}

impl Mutation {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::SetChartType { title, .. } | Self::Move { title, .. } | Self::Delete { title } => {
                title
            }
        }
    }

    fn into_gesture(self) -> Gesture {
        match self {
            Self::SetChartType { title, chart_type } => Gesture::SetChartType { title, chart_type },
            Self::Move {
                title, direction, ..
            } => Gesture::Move { title, direction },
            Self::Delete { title } => Gesture::Delete { title },
        }
    }
}

/// What an outstanding request was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Upload { file_name: String },
    Select { title: String },
    Mutation(Mutation),
}

impl Pending {
    /// Human-readable operation name, used in notices and logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "upload",
            Self::Select { .. } => "chart selection",
            Self::Mutation(Mutation::SetChartType { .. }) => "chart type change",
            Self::Mutation(Mutation::Move { .. }) => "move",
            Self::Mutation(Mutation::Delete { .. }) => "delete",
        }
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Upload { .. } => None,
            Self::Select { title } => Some(title),
            Self::Mutation(m) => Some(m.title()),
        }
    }
}

/// Chart list controller over a list surface `L` and a plot surface `P`.
pub struct Controller<L, P> {
    list: L,
    plot: P,
    viewer: ViewerState,
    config: ClientConfig,
    guard: InFlightGuard,
    pending: HashMap<Ticket, Pending>,
    next_ticket: u64,
}

impl<L: ListSurface, P: PlotSurface> Controller<L, P> {
    #[must_use]
    pub fn new(list: L, plot: P, config: ClientConfig) -> Self {
        Self {
            list,
            plot,
            viewer: ViewerState::Blank,
            guard: InFlightGuard::new(config.inflight_policy),
            config,
            pending: HashMap::new(),
            next_ticket: 1,
        }
    }

    /// Process one message.
    pub fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::Gesture(gesture) => self.on_gesture(gesture),
            Msg::Completed { ticket, outcome } => self.on_completed(ticket, outcome),
            Msg::ClearViewer => match self.clear_viewer() {
                Ok(()) => Cmd::None,
                Err(err) => {
                    let err = GestureError::from(err);
                    error!(error = %err, "viewer could not be cleared");
                    Cmd::notify(&err)
                }
            },
        }
    }

    /// Show the prompt and forget the selection.
    pub fn clear_viewer(&mut self) -> Result<(), SurfaceError> {
        self.plot.show_prompt()?;
        self.viewer.clear();
        debug!("viewer cleared");
        Ok(())
    }

    #[must_use]
    pub fn list(&self) -> &L {
        &self.list
    }

    /// Mutable access for hosts that drive the surface directly, such as a
    /// test standing in for the browser's live control state.
    pub fn list_mut(&mut self) -> &mut L {
        &mut self.list
    }

    #[must_use]
    pub fn plot(&self) -> &P {
        &self.plot
    }

    #[must_use]
    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn guard(&self) -> &InFlightGuard {
        &self.guard
    }

    /// Requests issued and not yet completed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn pending(&self, ticket: Ticket) -> Option<&Pending> {
        self.pending.get(&ticket)
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    fn on_gesture(&mut self, gesture: Gesture) -> Cmd {
        let span = debug_span!(
            "gesture",
            kind = gesture.kind(),
            title = gesture.title().unwrap_or_default()
        );
        let _enter = span.enter();

        match gesture {
            Gesture::Upload(files) => {
                if files.is_empty() {
                    debug!("upload without files ignored");
                    return Cmd::None;
                }
                let cmds = files.into_iter().map(|file| self.upload(file)).collect();
                Cmd::batch(cmds)
            }
            Gesture::Select { title } => self.select(title),
            Gesture::SetChartType { title, chart_type } => {
                if !self.config.chart_types.accepts(chart_type.as_str()) {
                    let err = GestureError::UnknownChartType {
                        chart_type: chart_type.to_string(),
                    };
                    warn!(error = %err, "chart type change refused");
                    self.restore_chart_type(&title);
                    return Cmd::notify(&err);
                }
                self.mutate(Mutation::SetChartType { title, chart_type })
            }
            Gesture::Move { title, direction } => {
                let neighbor = match direction {
                    MoveDirection::Up => self.list.previous_sibling(&title),
                    MoveDirection::Down => self.list.next_sibling(&title),
                };
                let Some(neighbor) = neighbor else {
                    debug!(direction = direction.as_str(), "move at list boundary ignored");
                    return Cmd::None;
                };
                self.mutate(Mutation::Move {
                    title,
                    direction,
                    neighbor,
                })
            }
            Gesture::Delete { title } => self.mutate(Mutation::Delete { title }),
        }
    }

    fn upload(&mut self, file: UploadFile) -> Cmd {
        let file_name = file.name.clone();
        let request = HttpRequest::upload(self.config.endpoints.upload.clone(), file);
        self.issue(Pending::Upload { file_name }, Ok(request))
    }

    fn select(&mut self, title: String) -> Cmd {
        let request = HttpRequest::json(
            self.config.endpoints.show_chart.clone(),
            &ChartTitleRequest {
                chart_title: title.clone(),
            },
        );
        self.issue(Pending::Select { title }, request)
    }

    fn mutate(&mut self, mutation: Mutation) -> Cmd {
        if !self.list.contains(mutation.title()) {
            debug!("no such row; gesture ignored");
            return Cmd::None;
        }
        let title = mutation.title().to_string();
        let gesture = mutation.clone().into_gesture();
        match self.guard.admit(&title, &gesture) {
            Admission::Proceed => {
                let request = self.mutation_request(&mutation);
                self.issue(Pending::Mutation(mutation), request)
            }
            Admission::Rejected => {
                debug!("gesture rejected by in-flight guard");
                self.restore_control(&mutation);
                Cmd::notify(&GestureError::Busy { title })
            }
            Admission::Queued { depth } => {
                debug!(depth, "gesture parked behind outstanding change");
                Cmd::None
            }
        }
    }

    fn mutation_request(&self, mutation: &Mutation) -> Result<HttpRequest, serde_json::Error> {
        let endpoints = &self.config.endpoints;
        match mutation {
            Mutation::SetChartType { title, chart_type } => HttpRequest::json(
                endpoints.set_chart_type.clone(),
                &SetChartTypeRequest {
                    selected_type: chart_type.to_string(),
                    chart_title: title.clone(),
                    is_currently_visible: self.viewer.is_showing(title),
                },
            ),
            Mutation::Move {
                title, direction, ..
            } => HttpRequest::json(
                endpoints.move_chart.clone(),
                &MoveChartRequest {
                    chart_title: title.clone(),
                    move_up: direction.is_up(),
                },
            ),
            Mutation::Delete { title } => HttpRequest::json(
                endpoints.delete_chart.clone(),
                &ChartTitleRequest {
                    chart_title: title.clone(),
                },
            ),
        }
    }

    fn issue(&mut self, pending: Pending, request: Result<HttpRequest, serde_json::Error>) -> Cmd {
        match request {
            Ok(request) => {
                let ticket = Ticket(self.next_ticket);
                self.next_ticket += 1;
                debug!(%ticket, %request, operation = pending.operation(), "request issued");
                self.pending.insert(ticket, pending);
                Cmd::Send { ticket, request }
            }
            Err(err) => {
                let err = GestureError::Encode {
                    operation: pending.operation(),
                    detail: err.to_string(),
                };
                error!(error = %err, "request not issued");
                if let Pending::Mutation(mutation) = &pending {
                    self.restore_control(mutation);
                }
                let replay = self.settle(&pending, false);
                Cmd::batch(vec![Cmd::notify(&err), replay])
            }
        }
    }

    // ------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------

    fn on_completed(&mut self, ticket: Ticket, outcome: TransportOutcome) -> Cmd {
        let Some(pending) = self.pending.remove(&ticket) else {
            debug!(%ticket, "completion for unknown ticket dropped");
            return Cmd::None;
        };
        let span = debug_span!(
            "completion",
            %ticket,
            operation = pending.operation(),
            title = pending.title().unwrap_or_default()
        );
        let _enter = span.enter();

        let result = self.apply(&pending, outcome);
        let removed = result.is_ok()
            && matches!(pending, Pending::Mutation(Mutation::Delete { .. }));
        let effect = match result {
            Ok(followup) => followup,
            Err(err) => {
                match err.level() {
                    NoticeLevel::Error => error!(error = %err, "gesture failed"),
                    _ => warn!(error = %err, "gesture failed"),
                }
                if let Pending::Mutation(mutation) = &pending {
                    self.restore_control(mutation);
                }
                Cmd::notify(&err)
            }
        };
        let replay = self.settle(&pending, removed);
        Cmd::batch(vec![effect, replay])
    }

    /// Apply a terminal outcome. Surfaces are touched only after every
    /// check on the response has passed.
    fn apply(&mut self, pending: &Pending, outcome: TransportOutcome) -> Result<Cmd, GestureError> {
        let response = outcome?;
        if !response.is_ok() {
            return Err(GestureError::Http {
                status: response.status,
            });
        }
        let operation = pending.operation();

        match pending {
            Pending::Upload { file_name } => {
                self.list.replace_contents(&response.body)?;
                debug!(file = %file_name, rows = self.list.row_count(), "list replaced");
                Ok(Cmd::None)
            }
            Pending::Select { .. } => {
                let shown: ShowChartResponse = decode(operation, &response)?;
                self.plot.show_plot(&shown.chart_title, &shown.chart_plot_url)?;
                debug!(shown = %shown.chart_title, url = %shown.chart_plot_url, "plot shown");
                self.viewer.show(shown.chart_title, shown.chart_plot_url);
                Ok(Cmd::None)
            }
            Pending::Mutation(Mutation::SetChartType { title, chart_type }) => {
                let ack: SetChartTypeResponse = decode(operation, &response)?;
                let Some(refresh) = ack.update_plot else {
                    return Err(GestureError::ServerRejected { operation });
                };
                if self.list.contains(title) {
                    self.list.set_chart_type(title, chart_type)?;
                    debug!(%chart_type, "chart type confirmed");
                }
                if refresh {
                    debug!("plot refresh requested");
                    Ok(self.select(title.clone()))
                } else {
                    Ok(Cmd::None)
                }
            }
            Pending::Mutation(Mutation::Move {
                title,
                direction,
                neighbor,
            }) => {
                acknowledged(operation, &response)?;
                let current = match direction {
                    MoveDirection::Up => self.list.previous_sibling(title),
                    MoveDirection::Down => self.list.next_sibling(title),
                };
                if current.as_deref() != Some(neighbor.as_str()) {
                    debug!(
                        direction = direction.as_str(),
                        %neighbor,
                        current = current.as_deref().unwrap_or_default(),
                        "rows changed since the move was issued; nothing to swap"
                    );
                    return Ok(Cmd::None);
                }
                let (earlier, later) = match direction {
                    MoveDirection::Up => (neighbor.as_str(), title.as_str()),
                    MoveDirection::Down => (title.as_str(), neighbor.as_str()),
                };
                self.list.swap_adjacent(earlier, later)?;
                debug!(%earlier, %later, "rows swapped");
                Ok(Cmd::None)
            }
            Pending::Mutation(Mutation::Delete { title }) => {
                acknowledged(operation, &response)?;
                if self.list.contains(title) {
                    self.list.remove_row(title)?;
                } else {
                    warn!("confirmed delete for a row no longer shown");
                }
                if self.list.row_count() == 0 && !self.list.is_showing_empty_state() {
                    self.list.show_empty_state()?;
                    debug!("list emptied; placeholder shown");
                }
                Ok(Cmd::None)
            }
        }
    }

    /// Put a type control back on the row's confirmed chart type after a
    /// change that will not be applied.
    fn restore_control(&mut self, mutation: &Mutation) {
        if let Mutation::SetChartType { title, .. } = mutation {
            self.restore_chart_type(title);
        }
    }

    fn restore_chart_type(&mut self, title: &str) {
        let Some(confirmed) = self.list.chart_type(title) else {
            return;
        };
        match self.list.set_chart_type(title, &confirmed) {
            Ok(()) => debug!(%confirmed, "type control restored"),
            Err(err) => warn!(error = %err, "type control could not be restored"),
        }
    }

    /// Release the guard for a finished mutation and replay parked gestures.
    /// Gestures parked behind a successful delete are discarded.
    fn settle(&mut self, pending: &Pending, removed: bool) -> Cmd {
        let Pending::Mutation(mutation) = pending else {
            return Cmd::None;
        };
        let parked = self.guard.release(mutation.title());
        if parked.is_empty() {
            return Cmd::None;
        }
        if removed {
            debug!(discarded = parked.len(), "parked gestures dropped after delete");
            return Cmd::None;
        }
        let cmds = parked.into_iter().map(|g| self.on_gesture(g)).collect();
        Cmd::batch(cmds)
    }
}

impl<L, P> fmt::Debug for Controller<L, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("viewer", &self.viewer)
            .field("in_flight", &self.pending.len())
            .field("next_ticket", &self.next_ticket)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: &HttpResponse,
) -> Result<T, GestureError> {
    serde_json::from_str(&response.body).map_err(|e| GestureError::MalformedResponse {
        operation,
        detail: e.to_string(),
    })
}

fn acknowledged(operation: &'static str, response: &HttpResponse) -> Result<(), GestureError> {
    let ack: AckResponse = decode(operation, response)?;
    match ack.success {
        Some(true) => Ok(()),
        _ => Err(GestureError::ServerRejected { operation }),
    }
}
