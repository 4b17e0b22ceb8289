#![forbid(unsafe_code)]

//! End-to-end scenarios against the in-memory server.

use std::time::Duration;

use chartdeck_core::{ChartTypeCatalog, EMPTY_STATE_HTML, ViewerState};
use chartdeck_harness::{Fault, Session};
use chartdeck_runtime::{ClientConfig, InflightPolicy, NoticeLevel};
use pretty_assertions::assert_eq;

#[test]
fn moves_follow_server_confirmation() {
    let mut s = Session::with_titles(&["A", "B", "C"]);

    s.move_up("B");
    assert_eq!(s.rows(), ["A", "B", "C"]);
    assert_eq!(s.server_titles(), ["B", "A", "C"]);
    s.settle();
    assert_eq!(s.rows(), ["B", "A", "C"]);

    s.move_down("A");
    s.settle();
    assert_eq!(s.rows(), ["B", "C", "A"]);
    assert!(s.in_sync());
}

#[test]
fn boundary_moves_send_nothing() {
    let mut s = Session::with_titles(&["A", "B"]);
    let before = s.markup();
    let result = s.move_up("A");
    assert_eq!(result.requests_issued, 0);
    s.move_down("B");
    assert_eq!(s.pending_len(), 0);
    assert_eq!(s.server().borrow().handled(), 0);
    assert_eq!(s.markup(), before);
}

#[test]
fn selection_drives_the_viewer() {
    let mut s = Session::with_titles(&["Revenue", "Costs"]);
    assert_eq!(s.viewer(), &ViewerState::Blank);

    s.select("Revenue");
    assert_eq!(s.viewer(), &ViewerState::Blank);
    s.settle();
    assert_eq!(
        s.viewer(),
        &ViewerState::Showing {
            title: "Revenue".into(),
            plot_url: "/Revenue_ichart.png".into(),
        }
    );

    s.server().borrow_mut().inject("/show_chart", Fault::Status(500));
    s.select("Costs");
    s.settle();
    assert_eq!(s.viewer().title(), Some("Revenue"));
    assert_eq!(
        s.runtime().plot().plot_url(),
        Some("/Revenue_ichart.png")
    );
    let notices = s.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "server answered with status 500");

    s.clear_viewer();
    assert_eq!(s.viewer(), &ViewerState::Blank);
}

#[test]
fn changing_type_of_visible_chart_refreshes_plot() {
    let mut s = Session::with_titles(&["Revenue", "Costs"]);
    s.select("Revenue");
    s.settle();

    s.set_chart_type("Revenue", "xbar");
    let result = s.settle();
    assert_eq!(result.completions, 2);
    assert_eq!(s.viewer().plot_url(), Some("/Revenue_xbar.png"));

    s.set_chart_type("Costs", "xbar");
    let result = s.settle();
    assert_eq!(result.completions, 1);
    assert_eq!(s.viewer().title(), Some("Revenue"));
}

#[test]
fn deleting_everything_shows_placeholder_until_upload() {
    let mut s = Session::with_titles(&["A"]);
    s.delete("A");
    s.settle();
    assert!(s.shows_placeholder());
    assert_eq!(s.markup(), EMPTY_STATE_HTML);

    s.upload(["Revenue.csv"]);
    s.settle();
    assert!(!s.shows_placeholder());
    assert_eq!(s.rows(), ["Revenue"]);
    assert!(s.in_sync());
}

#[test]
fn two_uploads_last_response_wins() {
    let mut s = Session::with_titles(&[]);
    let result = s.upload(["Revenue.csv", "Costs.csv"]);
    assert_eq!(result.requests_issued, 2);

    // Answer the second upload first; the first answer then overwrites it.
    s.deliver_last();
    assert_eq!(s.rows(), ["Revenue", "Costs"]);
    s.deliver_next();
    assert_eq!(s.rows(), ["Revenue"]);
    assert!(!s.in_sync());

    s.upload(["Margin.csv"]);
    s.settle();
    assert_eq!(s.rows(), ["Revenue", "Costs", "Margin"]);
}

#[test]
fn failures_leave_markup_untouched() {
    let mut s = Session::with_titles(&["A", "B", "C"]);
    let before = s.markup();
    for fault in [
        Fault::Declined,
        Fault::Garbage,
        Fault::Network,
        Fault::Status(404),
    ] {
        s.server().borrow_mut().inject("/_move_chart", fault.clone());
        s.move_up("C");
        s.settle();
        s.server().borrow_mut().inject("/_delete_chart", fault.clone());
        s.delete("A");
        s.settle();
        s.server().borrow_mut().inject("/_set_chart_type", fault);
        s.set_chart_type("B", "xbar");
        s.settle();
        assert_eq!(s.markup(), before);
        assert_eq!(s.control_value("B").as_deref(), Some("ichart"));
    }
    assert!(s.in_sync());
    assert!(s.chart_types_in_sync());
    assert!(s.notices().iter().all(|n| n.level != NoticeLevel::Info));
}

#[test]
fn offline_transport_surfaces_an_error() {
    let mut s = Session::with_titles(&["A", "B"]);
    s.runtime_mut().transport_mut().set_offline(true);
    s.move_up("B");
    assert_eq!(s.rows(), ["A", "B"]);
    let notices = s.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[test]
fn hung_requests_time_out() {
    let config = ClientConfig {
        request_timeout_ms: Some(2_000),
        ..ClientConfig::default()
    };
    let mut s = Session::with_titles_and_config(&["A", "B"], config);
    s.move_up("B");
    s.runtime_mut().transport_mut().hang(0);
    s.advance_time(Duration::from_millis(2_000));

    assert_eq!(s.runtime().in_flight(), 0);
    assert_eq!(s.rows(), ["A", "B"]);
    // The server did apply the move; the client cannot know.
    assert_eq!(s.server_titles(), ["B", "A"]);
    assert_eq!(
        s.notices().last().map(|n| n.message.clone()),
        Some("server did not answer within 2000 ms".to_string())
    );
}

#[test]
fn rejected_second_gesture_on_same_title() {
    let mut s = Session::with_titles(&["A", "B", "C"]);
    s.move_down("A");
    let result = s.move_down("A");
    assert_eq!(result.requests_issued, 0);
    assert_eq!(s.notices()[0].level, NoticeLevel::Info);
    s.settle();
    assert_eq!(s.rows(), ["B", "A", "C"]);
    assert!(s.in_sync());
}

#[test]
fn queued_second_gesture_replays_in_order() {
    let config = ClientConfig {
        inflight_policy: InflightPolicy::Queue,
        ..ClientConfig::default()
    };
    let mut s = Session::with_titles_and_config(&["A", "B", "C"], config);
    s.move_down("A");
    s.move_down("A");
    assert_eq!(s.pending_len(), 1);
    s.settle();
    assert_eq!(s.rows(), ["B", "C", "A"]);
    assert!(s.in_sync());
    assert!(s.notices().is_empty());
}

#[test]
fn move_racing_a_delete_stays_in_sync() {
    let mut s = Session::with_titles(&["A", "B", "C"]);
    s.move_up("C");
    s.delete("B");
    // Server saw the move first: [A, C, B] then deleted B: [A, C].
    assert_eq!(s.server_titles(), ["A", "C"]);

    s.deliver_last();
    assert_eq!(s.rows(), ["A", "C"]);
    // C no longer sits under B, so the late move has nothing to swap.
    s.deliver_next();
    assert_eq!(s.rows(), ["A", "C"]);
    assert!(s.in_sync());
    assert!(s.notices().is_empty());
}

#[test]
fn move_answered_after_an_upload_is_not_applied_twice() {
    let mut s = Session::with_titles(&["A", "B", "C"]);
    s.move_down("A");
    s.upload(["D.csv"]);
    assert_eq!(s.server_titles(), ["B", "A", "C", "D"]);

    // The upload's list already shows the move.
    s.deliver_last();
    assert_eq!(s.rows(), ["B", "A", "C", "D"]);
    s.deliver_next();
    assert_eq!(s.rows(), ["B", "A", "C", "D"]);
    assert!(s.in_sync());
}

#[test]
fn move_answered_before_an_upload_lands_once() {
    let mut s = Session::with_titles(&["A", "B", "C"]);
    s.move_down("A");
    s.upload(["D.csv"]);
    s.deliver_next();
    assert_eq!(s.rows(), ["B", "A", "C"]);
    s.deliver_next();
    assert_eq!(s.rows(), ["B", "A", "C", "D"]);
    assert!(s.in_sync());
}

#[test]
fn declined_type_change_puts_the_control_back() {
    let mut s = Session::with_titles(&["A", "B"]);
    s.server().borrow_mut().inject("/_set_chart_type", Fault::Declined);
    s.set_chart_type("A", "xbar");
    assert_eq!(s.control_value("A").as_deref(), Some("xbar"));
    s.settle();
    assert_eq!(s.control_value("A").as_deref(), Some("ichart"));
    assert!(s.chart_types_in_sync());

    s.set_chart_type("A", "xbar");
    s.settle();
    assert_eq!(s.control_value("A").as_deref(), Some("xbar"));
    assert!(s.chart_types_in_sync());
}

#[test]
fn unknown_type_is_refused_and_the_control_reverts() {
    let config = ClientConfig {
        chart_types: ChartTypeCatalog::new(["ichart", "xbar"]),
        ..ClientConfig::default()
    };
    let mut s = Session::with_titles_and_config(&["A"], config);
    let result = s.set_chart_type("A", "pie");
    assert_eq!(result.requests_issued, 0);
    assert_eq!(s.control_value("A").as_deref(), Some("ichart"));
    assert_eq!(s.notices().len(), 1);
}
