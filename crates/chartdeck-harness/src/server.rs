#![forbid(unsafe_code)]

//! In-memory authoritative chart server.
//!
//! [`FakeServer`] owns the entry list the way the real backend does and
//! answers the five client endpoints with the same payloads. Failures can be
//! injected per path so tests can exercise every error branch of the client.

use std::collections::VecDeque;

use chartdeck_core::{ChartType, ChartTypeCatalog, Entry, EntryList, MoveDirection, fragment};
use chartdeck_runtime::protocol::{
    AckResponse, ChartTitleRequest, MoveChartRequest, SetChartTypeRequest, SetChartTypeResponse,
    ShowChartResponse,
};
use chartdeck_runtime::{Body, Endpoints, HttpRequest, HttpResponse, TransportError};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Chart type given to uploads when the catalogue is empty.
pub const FALLBACK_CHART_TYPE: &str = "ichart";

/// A scripted failure for the next request on a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this status and an empty body.
    Status(u16),
    /// Answer 200 with the operation's flag set to `false`.
    Declined,
    /// Answer 200 with a body that is not the expected JSON.
    Garbage,
    /// Fail before any status arrives.
    Network,
}

/// Terminal outcome produced by the server for one request.
pub type ServerOutcome = Result<HttpResponse, TransportError>;

#[derive(Debug, Clone)]
pub struct FakeServer {
    entries: EntryList,
    catalog: ChartTypeCatalog,
    endpoints: Endpoints,
    faults: VecDeque<(String, Fault)>,
    handled: usize,
}

impl FakeServer {
    #[must_use]
    pub fn new(catalog: ChartTypeCatalog) -> Self {
        Self {
            entries: EntryList::new(),
            catalog,
            endpoints: Endpoints::default(),
            faults: VecDeque::new(),
            handled: 0,
        }
    }

    /// A server holding `titles` in order, all of the default chart type.
    #[must_use]
    pub fn with_titles<I, S>(catalog: ChartTypeCatalog, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut server = Self::new(catalog);
        let chart_type = server.default_chart_type();
        for title in titles {
            // Duplicate titles are skipped, as the backend refuses them.
            let _ = server.entries.push(Entry::new(title, chart_type.clone()));
        }
        server
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &EntryList {
        &self.entries
    }

    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.entries.titles()
    }

    #[must_use]
    pub fn catalog(&self) -> &ChartTypeCatalog {
        &self.catalog
    }

    /// Requests handled so far, including faulted ones.
    #[must_use]
    pub const fn handled(&self) -> usize {
        self.handled
    }

    /// The page the server would render: every row, or the placeholder.
    #[must_use]
    pub fn render(&self) -> String {
        fragment::render_list(self.entries.as_slice(), &self.catalog)
    }

    /// Fail the next request to `path` with `fault`. Faults queue up in order.
    pub fn inject(&mut self, path: impl Into<String>, fault: Fault) {
        self.faults.push_back((path.into(), fault));
    }

    /// Drop every fault not yet consumed.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Plot reference for an entry: `/<title>_<type>.png`.
    #[must_use]
    pub fn plot_url(entry: &Entry) -> String {
        format!("/{}_{}.png", entry.title, entry.chart_type)
    }

    fn default_chart_type(&self) -> ChartType {
        self.catalog
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| ChartType::new(FALLBACK_CHART_TYPE))
    }

    /// Handle one request. Faults are consumed before the state changes, so
    /// a faulted request never mutates the list.
    pub fn handle(&mut self, request: &HttpRequest) -> ServerOutcome {
        self.handled += 1;
        if let Some(fault) = self.take_fault(&request.path) {
            debug!(%request, ?fault, "fault injected");
            return match fault {
                Fault::Status(status) => Ok(HttpResponse::new(status, "")),
                Fault::Declined => Ok(HttpResponse::new(
                    200,
                    r#"{"success":false,"updatePlot":null}"#,
                )),
                Fault::Garbage => Ok(HttpResponse::new(200, "<html>oops</html>")),
                Fault::Network => Err(TransportError::Network("connection reset".into())),
            };
        }

        let path = request.path.as_str();
        let response = if path == self.endpoints.upload {
            self.upload(request)
        } else if path == self.endpoints.set_chart_type {
            self.set_chart_type(request)
        } else if path == self.endpoints.show_chart {
            self.show_chart(request)
        } else if path == self.endpoints.move_chart {
            self.move_chart(request)
        } else if path == self.endpoints.delete_chart {
            self.delete_chart(request)
        } else {
            HttpResponse::new(404, "")
        };
        debug!(%request, status = response.status, "request handled");
        Ok(response)
    }

    fn take_fault(&mut self, path: &str) -> Option<Fault> {
        let index = self.faults.iter().position(|(p, _)| p == path)?;
        self.faults.remove(index).map(|(_, fault)| fault)
    }

    fn upload(&mut self, request: &HttpRequest) -> HttpResponse {
        let Body::Multipart { file, .. } = &request.body else {
            return HttpResponse::new(400, "");
        };
        let title = file
            .name
            .rsplit_once('.')
            .map_or(file.name.as_str(), |(stem, _)| stem);
        if title.is_empty() {
            return HttpResponse::new(400, "");
        }
        let entry = Entry::new(title, self.default_chart_type());
        if self.entries.push(entry).is_err() {
            return HttpResponse::new(409, "");
        }
        HttpResponse::new(200, self.render())
    }

    fn set_chart_type(&mut self, request: &HttpRequest) -> HttpResponse {
        let Some(req) = decode::<SetChartTypeRequest>(request) else {
            return HttpResponse::new(400, "");
        };
        if !self.catalog.accepts(&req.selected_type) {
            return json(&SetChartTypeResponse { update_plot: None });
        }
        match self
            .entries
            .set_chart_type(&req.chart_title, ChartType::new(req.selected_type))
        {
            Ok(()) => json(&SetChartTypeResponse {
                update_plot: Some(req.is_currently_visible),
            }),
            Err(_) => HttpResponse::new(404, ""),
        }
    }

    fn show_chart(&mut self, request: &HttpRequest) -> HttpResponse {
        let Some(req) = decode::<ChartTitleRequest>(request) else {
            return HttpResponse::new(400, "");
        };
        match self.entries.get(&req.chart_title) {
            Some(entry) => json(&ShowChartResponse {
                chart_title: entry.title.clone(),
                chart_plot_url: Self::plot_url(entry),
            }),
            None => HttpResponse::new(404, ""),
        }
    }

    fn move_chart(&mut self, request: &HttpRequest) -> HttpResponse {
        let Some(req) = decode::<MoveChartRequest>(request) else {
            return HttpResponse::new(400, "");
        };
        let direction = if req.move_up {
            MoveDirection::Up
        } else {
            MoveDirection::Down
        };
        match self.entries.move_entry(&req.chart_title, direction) {
            Ok(moved) => json(&AckResponse {
                success: Some(moved),
            }),
            Err(_) => HttpResponse::new(404, ""),
        }
    }

    fn delete_chart(&mut self, request: &HttpRequest) -> HttpResponse {
        let Some(req) = decode::<ChartTitleRequest>(request) else {
            return HttpResponse::new(400, "");
        };
        let removed = self.entries.remove(&req.chart_title).is_some();
        json(&AckResponse {
            success: Some(removed),
        })
    }
}

fn decode<T: DeserializeOwned>(request: &HttpRequest) -> Option<T> {
    serde_json::from_str(request.json_body()?).ok()
}

fn json<T: serde::Serialize>(payload: &T) -> HttpResponse {
    HttpResponse::json(payload).unwrap_or_else(|e| HttpResponse::new(500, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdeck_core::UploadFile;
    use pretty_assertions::assert_eq;

    fn server(titles: &[&str]) -> FakeServer {
        FakeServer::with_titles(ChartTypeCatalog::new(["ichart", "xbar"]), titles.iter().copied())
    }

    fn post<T: serde::Serialize>(path: &str, payload: &T) -> HttpRequest {
        HttpRequest::json(path, payload).unwrap()
    }

    fn body(outcome: ServerOutcome) -> (u16, String) {
        let response = outcome.unwrap();
        (response.status, response.body)
    }

    #[test]
    fn move_reports_boundaries_as_unsuccessful() {
        let mut s = server(&["A", "B"]);
        let up = |t: &str| MoveChartRequest {
            chart_title: t.into(),
            move_up: true,
        };
        assert_eq!(
            body(s.handle(&post("/_move_chart", &up("B")))),
            (200, r#"{"success":true}"#.to_string())
        );
        assert_eq!(s.titles(), ["B", "A"]);
        assert_eq!(
            body(s.handle(&post("/_move_chart", &up("B")))),
            (200, r#"{"success":false}"#.to_string())
        );
        assert_eq!(body(s.handle(&post("/_move_chart", &up("Z")))).0, 404);
    }

    #[test]
    fn type_change_echoes_visibility() {
        let mut s = server(&["A"]);
        let req = SetChartTypeRequest {
            selected_type: "xbar".into(),
            chart_title: "A".into(),
            is_currently_visible: true,
        };
        assert_eq!(
            body(s.handle(&post("/_set_chart_type", &req))),
            (200, r#"{"updatePlot":true}"#.to_string())
        );
        assert_eq!(
            s.entries().get("A").map(|e| e.chart_type.as_str()),
            Some("xbar")
        );
        let show = ChartTitleRequest {
            chart_title: "A".into(),
        };
        assert_eq!(
            body(s.handle(&post("/show_chart", &show))),
            (
                200,
                r#"{"chartTitle":"A","chartPlotUrl":"/A_xbar.png"}"#.to_string()
            )
        );
    }

    #[test]
    fn upload_appends_and_renders_whole_list() {
        let mut s = server(&["A"]);
        let (status, html) = body(s.handle(&HttpRequest::upload(
            "/_upload",
            UploadFile::new("Revenue.xlsx", b"data".to_vec()),
        )));
        assert_eq!(status, 200);
        assert_eq!(fragment::scan(&html).ids(), ["A", "Revenue"]);
        let duplicate = s.handle(&HttpRequest::upload(
            "/_upload",
            UploadFile::new("Revenue.csv", b"data".to_vec()),
        ));
        assert_eq!(body(duplicate).0, 409);
    }

    #[test]
    fn faults_do_not_mutate_state() {
        let mut s = server(&["A", "B"]);
        s.inject("/_delete_chart", Fault::Network);
        s.inject("/_delete_chart", Fault::Declined);
        let delete = ChartTitleRequest {
            chart_title: "A".into(),
        };
        assert!(s.handle(&post("/_delete_chart", &delete)).is_err());
        assert_eq!(
            body(s.handle(&post("/_delete_chart", &delete))).1,
            r#"{"success":false,"updatePlot":null}"#
        );
        assert_eq!(s.titles(), ["A", "B"]);
        assert_eq!(s.handled(), 2);
    }

    #[test]
    fn empty_server_renders_placeholder() {
        let s = server(&[]);
        assert_eq!(s.render(), fragment::EMPTY_STATE_HTML);
    }
}
