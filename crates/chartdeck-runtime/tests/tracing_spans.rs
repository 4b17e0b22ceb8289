#![forbid(unsafe_code)]

//! Tracing instrumentation tests.
//!
//! Every gesture runs inside a `gesture` span and every applied completion
//! inside a `completion` span, both carrying the operation and entry title.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chartdeck_core::{
    fragment, ChartTypeCatalog, Entry, Gesture, MemoryListSurface, MemoryPlotSurface,
    MoveDirection,
};
use chartdeck_runtime::{ClientConfig, HttpResponse, QueuedTransport, Runtime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_spans<F: FnOnce()>(f: F) -> Vec<CapturedSpan> {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCapture {
        spans: Arc::clone(&spans),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = spans.lock().unwrap().clone();
    captured
}

#[test]
fn gesture_and_completion_spans_carry_title() {
    let spans = with_captured_spans(|| {
        let html = fragment::render_list(
            &[Entry::new("A", "ichart"), Entry::new("B", "ichart")],
            &ChartTypeCatalog::default(),
        );
        let mut rt = Runtime::new(
            MemoryListSurface::from_html(&html),
            MemoryPlotSurface::new(),
            QueuedTransport::new(),
            ClientConfig::default(),
        );
        rt.dispatch(Gesture::Move {
            title: "B".into(),
            direction: MoveDirection::Up,
        });
        rt.transport_mut()
            .respond_next(Ok(HttpResponse::new(200, r#"{"success":true}"#)));
        rt.step();
    });

    let gesture = spans
        .iter()
        .find(|s| s.name == "gesture")
        .expect("gesture span");
    assert_eq!(gesture.fields.get("kind").map(String::as_str), Some("move"));
    assert_eq!(gesture.fields.get("title").map(String::as_str), Some("B"));

    let completion = spans
        .iter()
        .find(|s| s.name == "completion")
        .expect("completion span");
    assert_eq!(
        completion.fields.get("operation").map(String::as_str),
        Some("move")
    );
    assert_eq!(completion.fields.get("ticket").map(String::as_str), Some("#1"));
}

#[test]
fn unissued_requests_complete_inside_a_span() {
    let spans = with_captured_spans(|| {
        let mut rt = Runtime::new(
            MemoryListSurface::new(),
            MemoryPlotSurface::new(),
            QueuedTransport::unavailable(),
            ClientConfig::default(),
        );
        rt.dispatch(Gesture::Select {
            title: "missing".into(),
        });
    });
    assert_eq!(spans.iter().filter(|s| s.name == "gesture").count(), 1);
    assert_eq!(spans.iter().filter(|s| s.name == "completion").count(), 1);
}
