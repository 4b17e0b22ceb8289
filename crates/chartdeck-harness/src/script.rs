#![forbid(unsafe_code)]

//! Scripted session replay.
//!
//! A script is one command per line; `#` starts a comment. Replaying a
//! script drives a [`Session`] and records one JSON object per command, so
//! runs can be diffed.
//!
//! ```text
//! upload Revenue.csv Costs.csv
//! deliver
//! up Costs
//! fault /_delete_chart 500
//! delete Revenue
//! deliver
//! show
//! ```
//!
//! # JSONL Schema
//!
//! ```json
//! {"event":"step","idx":0,"cmd":"up Costs","rows":["Costs","Revenue"],"server":["Costs","Revenue"],"viewer":null,"pending":1,"notice":null}
//! {"event":"complete","steps":7,"in_sync":true}
//! ```

use std::fmt;
use std::time::Duration;

use chartdeck_core::{ListSurface, MoveDirection};
use serde_json::{Value, json};

use crate::server::Fault;
use crate::session::Session;

/// Which pending answers a `deliver` command releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Next,
    Last,
    /// Everything, including follow-up requests.
    All,
}

/// One script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Upload(Vec<String>),
    Select(String),
    SetType { title: String, chart_type: String },
    Move { title: String, direction: MoveDirection },
    Delete(String),
    ClearViewer,
    Deliver(Delivery),
    Fault { path: String, fault: Fault },
    Offline(bool),
    Tick(Duration),
    Show,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Parse a script into `(source line, step)` pairs.
pub fn parse(text: &str) -> Result<Vec<(String, Step)>, ScriptError> {
    let mut steps = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let step = parse_line(line).map_err(|message| ScriptError {
            line: idx + 1,
            message,
        })?;
        steps.push((line.to_string(), step));
    }
    Ok(steps)
}

fn parse_line(line: &str) -> Result<Step, String> {
    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let one = |what: &str| -> Result<String, String> {
        match args.as_slice() {
            [arg] => Ok((*arg).to_string()),
            _ => Err(format!("`{cmd}` takes one {what}")),
        }
    };

    match cmd {
        "upload" if !args.is_empty() => Ok(Step::Upload(
            args.iter().map(|a| (*a).to_string()).collect(),
        )),
        "upload" => Err("`upload` needs at least one file name".into()),
        "select" => one("title").map(Step::Select),
        "type" => match args.as_slice() {
            [title, chart_type] => Ok(Step::SetType {
                title: (*title).to_string(),
                chart_type: (*chart_type).to_string(),
            }),
            _ => Err("`type` takes a title and a chart type".into()),
        },
        "up" | "down" => one("title").map(|title| Step::Move {
            title,
            direction: if cmd == "up" {
                MoveDirection::Up
            } else {
                MoveDirection::Down
            },
        }),
        "delete" => one("title").map(Step::Delete),
        "clear" => Ok(Step::ClearViewer),
        "deliver" => match args.as_slice() {
            [] | ["all"] => Ok(Step::Deliver(Delivery::All)),
            ["next"] => Ok(Step::Deliver(Delivery::Next)),
            ["last"] => Ok(Step::Deliver(Delivery::Last)),
            _ => Err("`deliver` takes `next`, `last` or `all`".into()),
        },
        "fault" => match args.as_slice() {
            [path, kind] => Ok(Step::Fault {
                path: (*path).to_string(),
                fault: parse_fault(kind)?,
            }),
            _ => Err("`fault` takes a path and a fault".into()),
        },
        "offline" => match args.as_slice() {
            [] | ["on"] => Ok(Step::Offline(true)),
            ["off"] => Ok(Step::Offline(false)),
            _ => Err("`offline` takes `on` or `off`".into()),
        },
        "tick" => {
            let ms = one("duration in ms")?;
            ms.parse::<u64>()
                .map(|ms| Step::Tick(Duration::from_millis(ms)))
                .map_err(|e| format!("bad duration `{ms}`: {e}"))
        }
        "show" => Ok(Step::Show),
        other => Err(format!("unknown command `{other}`")),
    }
}

fn parse_fault(kind: &str) -> Result<Fault, String> {
    match kind {
        "declined" => Ok(Fault::Declined),
        "garbage" => Ok(Fault::Garbage),
        "network" => Ok(Fault::Network),
        status => status
            .parse::<u16>()
            .map(Fault::Status)
            .map_err(|_| format!("unknown fault `{status}`")),
    }
}

/// Apply one step to `session`.
pub fn apply(session: &mut Session, step: &Step) {
    match step {
        Step::Upload(names) => {
            session.upload(names.iter().cloned());
        }
        Step::Select(title) => {
            session.select(title);
        }
        Step::SetType { title, chart_type } => {
            session.set_chart_type(title, chart_type);
        }
        Step::Move { title, direction } => match direction {
            MoveDirection::Up => {
                session.move_up(title);
            }
            MoveDirection::Down => {
                session.move_down(title);
            }
        },
        Step::Delete(title) => {
            session.delete(title);
        }
        Step::ClearViewer => {
            session.clear_viewer();
        }
        Step::Deliver(Delivery::Next) => {
            session.deliver_next();
        }
        Step::Deliver(Delivery::Last) => {
            session.deliver_last();
        }
        Step::Deliver(Delivery::All) => {
            session.settle();
        }
        Step::Fault { path, fault } => session.server().borrow_mut().inject(path.clone(), fault.clone()),
        Step::Offline(offline) => session.runtime_mut().transport_mut().set_offline(*offline),
        Step::Tick(dt) => {
            session.advance_time(*dt);
        }
        Step::Show => {}
    }
}

/// Snapshot of the session after a step.
#[must_use]
pub fn snapshot(session: &Session, idx: usize, cmd: &str) -> Value {
    let notice = session.runtime().notices().last().map(|n| {
        json!({
            "level": n.level.as_str(),
            "message": n.message,
        })
    });
    let mut value = json!({
        "event": "step",
        "idx": idx,
        "cmd": cmd,
        "rows": session.rows(),
        "server": session.server_titles(),
        "viewer": session.viewer().title(),
        "pending": session.pending_len(),
        "notice": notice,
    });
    if cmd == "show" {
        value["markup"] = Value::String(session.runtime().list().markup());
        value["placeholder"] = Value::Bool(session.runtime().list().is_showing_empty_state());
    }
    value
}

/// Replay `steps`, returning one JSON line per step plus a summary.
pub fn replay(session: &mut Session, steps: &[(String, Step)]) -> Vec<String> {
    let mut lines = Vec::with_capacity(steps.len() + 1);
    for (idx, (cmd, step)) in steps.iter().enumerate() {
        apply(session, step);
        lines.push(snapshot(session, idx, cmd).to_string());
    }
    lines.push(
        json!({
            "event": "complete",
            "steps": steps.len(),
            "in_sync": session.in_sync(),
        })
        .to_string(),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands_and_skips_comments() {
        let steps = parse("# setup\nup B  # move it\n\ndeliver next\nfault /_upload 503\n").unwrap();
        let steps: Vec<Step> = steps.into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            steps,
            vec![
                Step::Move {
                    title: "B".into(),
                    direction: MoveDirection::Up
                },
                Step::Deliver(Delivery::Next),
                Step::Fault {
                    path: "/_upload".into(),
                    fault: Fault::Status(503)
                },
            ]
        );
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse("up A\nsideways A\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.to_string(), "line 2: unknown command `sideways`");
        assert!(parse("type A").is_err());
        assert!(parse("tick soon").is_err());
    }

    #[test]
    fn replay_reports_final_sync() {
        let mut session = Session::with_titles(&["A", "B", "C"]);
        let steps = parse("up B\ndeliver\ndown B\ndeliver\n").unwrap();
        let lines = replay(&mut session, &steps);
        assert_eq!(lines.len(), 5);
        assert_eq!(session.rows(), ["A", "B", "C"]);
        let last: Value = serde_json::from_str(&lines[4]).unwrap();
        assert_eq!(last["in_sync"], Value::Bool(true));
    }
}
