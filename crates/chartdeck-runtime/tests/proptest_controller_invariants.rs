#![forbid(unsafe_code)]

//! Property-based invariant tests for the mutation controller.
//!
//! Verifies:
//! 1. Confirmed moves keep the rendered order equal to the server's order
//! 2. A move up followed by a move down restores the original order
//! 3. Unconfirmed gestures never change the list markup
//! 4. The placeholder is shown exactly when no rows remain
//! 5. Late completions never change the list markup

use std::time::Duration;

use chartdeck_core::{
    fragment, ChartTypeCatalog, Entry, EntryList, Gesture, ListSurface, MemoryListSurface,
    MemoryPlotSurface, MoveDirection,
};
use chartdeck_runtime::{ClientConfig, HttpResponse, QueuedTransport, Runtime, TransportError};
use proptest::prelude::*;

type TestRuntime = Runtime<QueuedTransport, MemoryListSurface, MemoryPlotSurface>;

fn titles(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("chart-{i}")).collect()
}

fn runtime_for(titles: &[String], config: ClientConfig) -> TestRuntime {
    let entries: Vec<Entry> = titles.iter().map(|t| Entry::new(t.as_str(), "ichart")).collect();
    let html = fragment::render_list(&entries, &ChartTypeCatalog::new(["ichart"]));
    Runtime::new(
        MemoryListSurface::from_html(&html),
        MemoryPlotSurface::new(),
        QueuedTransport::new(),
        config,
    )
}

fn model_for(titles: &[String]) -> EntryList {
    EntryList::from_entries(titles.iter().map(|t| Entry::new(t.as_str(), "ichart")))
        .expect("unique titles")
}

fn ack(success: bool) -> HttpResponse {
    HttpResponse::new(200, format!(r#"{{"success":{success}}}"#))
}

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_direction() -> impl Strategy<Value = MoveDirection> {
    prop_oneof![Just(MoveDirection::Up), Just(MoveDirection::Down)]
}

#[derive(Debug, Clone)]
enum Failure {
    Declined,
    Status(u16),
    Garbage(String),
    Network,
}

fn arb_failure() -> impl Strategy<Value = Failure> {
    prop_oneof![
        Just(Failure::Declined),
        (300u16..600).prop_map(Failure::Status),
        "[a-z<>{} ]{0,20}".prop_map(Failure::Garbage),
        Just(Failure::Network),
    ]
}

fn failure_outcome(failure: &Failure) -> Result<HttpResponse, TransportError> {
    match failure {
        Failure::Declined => Ok(ack(false)),
        Failure::Status(status) => Ok(HttpResponse::new(*status, r#"{"success":true}"#)),
        Failure::Garbage(body) => Ok(HttpResponse::new(200, body.clone())),
        Failure::Network => Err(TransportError::Network("connection reset".into())),
    }
}

fn arb_failing_gesture(n: usize) -> impl Strategy<Value = (usize, u8, MoveDirection)> {
    (0..n, 0u8..3, arb_direction())
}

fn gesture_for(title: &str, kind: u8, direction: MoveDirection) -> Gesture {
    match kind {
        0 => Gesture::Move {
            title: title.into(),
            direction,
        },
        1 => Gesture::Delete {
            title: title.into(),
        },
        _ => Gesture::SetChartType {
            title: title.into(),
            chart_type: "xbar".into(),
        },
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Confirmed moves track the server order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn confirmed_moves_track_server_order(
        n in 1usize..8,
        moves in prop::collection::vec((0usize..8, arb_direction()), 0..24),
    ) {
        let titles = titles(n);
        let mut rt = runtime_for(&titles, ClientConfig::default());
        let mut server = model_for(&titles);

        for (index, direction) in moves {
            let title = titles[index % n].clone();
            rt.dispatch(Gesture::Move { title: title.clone(), direction });
            if rt.transport().pending_len() == 0 {
                // Boundary moves issue no request and must be boundary moves
                // on the server too.
                prop_assert_eq!(server.move_entry(&title, direction), Ok(false));
                continue;
            }
            prop_assert_eq!(server.move_entry(&title, direction), Ok(true));
            rt.transport_mut().respond_next(Ok(ack(true)));
            rt.step();
            prop_assert_eq!(rt.list().row_ids(), server.titles());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Up then down restores order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn up_then_down_restores_order(n in 2usize..8, pick in 1usize..8) {
        let titles = titles(n);
        let index = 1 + pick % (n - 1);
        let title = titles[index].clone();
        let mut rt = runtime_for(&titles, ClientConfig::default());
        let before = rt.list().markup();

        for direction in [MoveDirection::Up, MoveDirection::Down] {
            rt.dispatch(Gesture::Move { title: title.clone(), direction });
            prop_assert_eq!(rt.transport().pending_len(), 1);
            rt.transport_mut().respond_next(Ok(ack(true)));
            rt.step();
        }
        prop_assert_eq!(rt.list().markup(), before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Unconfirmed gestures never change markup
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unconfirmed_gestures_leave_markup_untouched(
        n in 1usize..6,
        attempts in prop::collection::vec((arb_failing_gesture(6), arb_failure()), 1..16),
    ) {
        let titles = titles(n);
        let mut rt = runtime_for(&titles, ClientConfig::default());
        let before = rt.list().markup();

        for ((index, kind, direction), failure) in attempts {
            let title = &titles[index % n];
            rt.dispatch(gesture_for(title, kind, direction));
            if rt.transport().pending_len() == 0 {
                continue;
            }
            rt.transport_mut().respond_next(failure_outcome(&failure));
            rt.step();
            prop_assert_eq!(rt.list().markup(), before.clone());
            prop_assert!(rt.notices().count() > 0);
        }
        prop_assert_eq!(rt.in_flight(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Placeholder shown exactly when empty
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn placeholder_iff_empty(
        n in 1usize..6,
        order in prop::collection::vec(0usize..6, 1..12),
    ) {
        let titles = titles(n);
        let mut rt = runtime_for(&titles, ClientConfig::default());

        for index in order {
            rt.dispatch(Gesture::Delete { title: titles[index % n].clone() });
            if rt.transport().pending_len() > 0 {
                rt.transport_mut().respond_next(Ok(ack(true)));
                rt.step();
            }
            let empty = rt.list().row_count() == 0;
            prop_assert_eq!(rt.list().is_showing_empty_state(), empty);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Late completions are ignored
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn late_completions_are_ignored(n in 2usize..6, wait_ms in 1u64..5_000) {
        let titles = titles(n);
        let config = ClientConfig { request_timeout_ms: Some(wait_ms), ..ClientConfig::default() };
        let mut rt = runtime_for(&titles, config);
        let before = rt.list().markup();

        rt.dispatch(Gesture::Move { title: titles[n - 1].clone(), direction: MoveDirection::Up });
        rt.advance_time(Duration::from_millis(wait_ms));
        prop_assert_eq!(rt.in_flight(), 0);

        rt.transport_mut().respond_next(Ok(ack(true)));
        rt.step();
        prop_assert_eq!(rt.list().markup(), before);
    }
}
