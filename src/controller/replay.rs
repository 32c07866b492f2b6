//! Deterministic playback of scripted page events.
//!
//! A script is JSON lines, one step per line:
//!
//! ```text
//! {"at_ms": 0, "event": {"kind": "widget_initialized", "location_search": "?q=rust"}}
//! {"at_ms": 250, "event": {"kind": "results_appeared"}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Timers fire at their
//! exact deadlines between steps, and any still pending after the last step
//! are drained.

use super::{Controller, Effect, PanelView, UiEvent, UiState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    pub event: UiEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub at_ms: u64,
    #[serde(flatten)]
    pub effect: Effect,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub timeline: Vec<TimelineEntry>,
    pub final_state: UiState,
    pub view: PanelView,
    pub pending_query: Option<String>,
}

#[derive(Debug)]
pub enum ReplayError {
    Io(std::io::Error),
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    OutOfOrder {
        line: usize,
        at_ms: u64,
        previous_ms: u64,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Io(err) => write!(f, "io error: {err}"),
            ReplayError::Parse { line, source } => write!(f, "line {line}: {source}"),
            ReplayError::OutOfOrder {
                line,
                at_ms,
                previous_ms,
            } => write!(
                f,
                "line {line}: step at {at_ms} ms comes before previous step at {previous_ms} ms"
            ),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Io(err) => Some(err),
            ReplayError::Parse { source, .. } => Some(source),
            ReplayError::OutOfOrder { .. } => None,
        }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(value: std::io::Error) -> Self {
        ReplayError::Io(value)
    }
}

pub fn read_script(mut reader: impl Read) -> Result<Vec<ScriptStep>, ReplayError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_script(&text)
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>, ReplayError> {
    let mut steps: Vec<ScriptStep> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: ScriptStep = serde_json::from_str(trimmed)
            .map_err(|source| ReplayError::Parse { line, source })?;
        if let Some(previous) = steps.last() {
            if step.at_ms < previous.at_ms {
                return Err(ReplayError::OutOfOrder {
                    line,
                    at_ms: step.at_ms,
                    previous_ms: previous.at_ms,
                });
            }
        }
        steps.push(step);
    }
    Ok(steps)
}

pub fn run_script(steps: Vec<ScriptStep>) -> ReplayReport {
    let origin = Instant::now();
    let mut controller = Controller::new();
    let mut timeline = Vec::new();

    for step in steps {
        let now = origin + Duration::from_millis(step.at_ms);
        drain_timers(&mut controller, origin, Some(now), &mut timeline);
        for effect in controller.handle(step.event, now) {
            timeline.push(TimelineEntry {
                at_ms: step.at_ms,
                effect,
            });
        }
    }
    drain_timers(&mut controller, origin, None, &mut timeline);

    ReplayReport {
        timeline,
        final_state: controller.state(),
        view: controller.view(),
        pending_query: controller.pending().peek(),
    }
}

/// Fires timers one deadline at a time so each effect carries the instant it
/// actually happened. With no `until`, runs until nothing is scheduled.
fn drain_timers(
    controller: &mut Controller,
    origin: Instant,
    until: Option<Instant>,
    timeline: &mut Vec<TimelineEntry>,
) {
    while let Some(deadline) = controller.next_deadline() {
        if until.is_some_and(|until| deadline > until) {
            break;
        }
        let at_ms = deadline.duration_since(origin).as_millis() as u64;
        for effect in controller.advance(deadline) {
            timeline.push(TimelineEntry { at_ms, effect });
        }
    }
}
