#![forbid(unsafe_code)]

//! Wire contract with the chart server.
//!
//! | Endpoint            | Request body                                        | Response                         |
//! |---------------------|-----------------------------------------------------|----------------------------------|
//! | `/_upload`          | multipart, field `userfile`                         | HTML fragment (list container)   |
//! | `/_set_chart_type`  | `{selectedType, chartTitle, isCurrentlyVisible}`    | `{updatePlot}`                   |
//! | `/show_chart`       | `{chartTitle}`                                      | `{chartTitle, chartPlotUrl}`     |
//! | `/_move_chart`      | `{chartTitle, moveUp}`                              | `{success}`                      |
//! | `/_delete_chart`    | `{chartTitle}`                                      | `{success}`                      |
//!
//! Field names are exact. Only a terminal status of 200 counts as success.

use std::fmt;

use chartdeck_core::UploadFile;
use serde::{Deserialize, Serialize};

/// Content type sent with every JSON body.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Multipart field carrying an uploaded file.
pub const UPLOAD_FIELD: &str = "userfile";

/// Server paths. Defaults match the reference server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub upload: String,
    pub set_chart_type: String,
    pub show_chart: String,
    pub move_chart: String,
    pub delete_chart: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            upload: "/_upload".into(),
            set_chart_type: "/_set_chart_type".into(),
            show_chart: "/show_chart".into(),
            move_chart: "/_move_chart".into(),
            delete_chart: "/_delete_chart".into(),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Serialized JSON text.
    Json(String),
    /// A single file in a multipart form.
    Multipart { field: String, file: UploadFile },
}

/// One request handed to a transport. Every endpoint is a POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub path: String,
    pub body: Body,
}

impl HttpRequest {
    /// A POST with a JSON body.
    pub fn json<T: Serialize>(path: impl Into<String>, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            path: path.into(),
            body: Body::Json(serde_json::to_string(payload)?),
        })
    }

    /// A multipart POST carrying one file under [`UPLOAD_FIELD`].
    #[must_use]
    pub fn upload(path: impl Into<String>, file: UploadFile) -> Self {
        Self {
            path: path.into(),
            body: Body::Multipart {
                field: UPLOAD_FIELD.to_string(),
                file,
            },
        }
    }

    /// Explicit content type, if the body needs one set by the caller.
    ///
    /// Multipart boundaries are chosen by the transport.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        match self.body {
            Body::Json(_) => Some(JSON_CONTENT_TYPE),
            Body::Multipart { .. } => None,
        }
    }

    /// JSON text of the body, if any.
    #[must_use]
    pub fn json_body(&self) -> Option<&str> {
        match &self.body {
            Body::Json(text) => Some(text),
            Body::Multipart { .. } => None,
        }
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POST {}", self.path)
    }
}

/// Terminal state of a request: status plus raw response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response carrying `payload` as JSON.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(200, serde_json::to_string(payload)?))
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// `/_set_chart_type` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChartTypeRequest {
    pub selected_type: String,
    pub chart_title: String,
    pub is_currently_visible: bool,
}

/// `/_set_chart_type` response. A missing flag is treated as a rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChartTypeResponse {
    #[serde(default)]
    pub update_plot: Option<bool>,
}

/// `/_move_chart` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveChartRequest {
    pub chart_title: String,
    pub move_up: bool,
}

/// Body shared by `/_delete_chart` and `/show_chart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartTitleRequest {
    pub chart_title: String,
}

/// `{success}` acknowledgement from move and delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: Option<bool>,
}

/// `/show_chart` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowChartResponse {
    pub chart_title: String,
    pub chart_plot_url: String,
}
