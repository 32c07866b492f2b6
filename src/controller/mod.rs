//! Page controller for the landing page.
//!
//! The controller sits between the page chrome (features panel, results
//! panel, loading indicator) and the hosted search widget. It owns no search
//! logic: it consumes [`UiEvent`]s, keeps the panel state machine, and returns
//! the [`Effect`]s a host must apply to the page. Time is passed in by the
//! caller, so the machine is deterministic; [`Controller::next_deadline`]
//! tells the host when to call [`Controller::advance`].

mod event;
mod location;
mod pending;
pub mod replay;

#[cfg(feature = "web")]
pub mod driver;

pub use event::{Effect, Fade, Focus, Key, Panel, PanelView, UiEvent};
pub use location::{QUERY_PARAM, query_param};
pub use pending::PendingQuery;

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Longest we wait for the widget to report results before revealing the
/// results panel anyway.
pub const RESULTS_MAX_WAIT: Duration = Duration::from_millis(1000);
/// Duration of each half of the clear animation.
pub const FADE_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiState {
    #[default]
    Idle,
    Loading,
    ShowingResults,
}

impl fmt::Display for UiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiState::Idle => write!(f, "idle"),
            UiState::Loading => write!(f, "loading"),
            UiState::ShowingResults => write!(f, "showing results"),
        }
    }
}

/// The single timed transition that may be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A search was submitted; results reveal at `deadline` at the latest.
    AwaitResults { deadline: Instant },
    /// Results are fading out as part of a clear.
    FadeOutResults { deadline: Instant },
    /// Features are fading back in; the clear completes at `deadline`.
    FadeInFeatures { deadline: Instant },
}

impl Transition {
    pub fn deadline(&self) -> Instant {
        match *self {
            Transition::AwaitResults { deadline }
            | Transition::FadeOutResults { deadline }
            | Transition::FadeInFeatures { deadline } => deadline,
        }
    }

    fn is_clearing(&self) -> bool {
        matches!(
            self,
            Transition::FadeOutResults { .. } | Transition::FadeInFeatures { .. }
        )
    }
}

/// Applies controller effects to a concrete page.
pub trait Page {
    fn apply(&mut self, effect: &Effect);
}

/// Records effects in order. Handy for hosts that batch updates and for tests.
impl Page for Vec<Effect> {
    fn apply(&mut self, effect: &Effect) {
        self.push(effect.clone());
    }
}

#[derive(Debug, Default)]
pub struct Controller {
    state: UiState,
    transition: Option<Transition>,
    view: PanelView,
    widget_ready: bool,
    pending: PendingQuery,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing pending-query slot, so code holding a clone of it can
    /// queue a search before the widget is ready.
    pub fn with_pending(pending: PendingQuery) -> Self {
        Self {
            pending,
            ..Self::default()
        }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn transition(&self) -> Option<Transition> {
        self.transition
    }

    pub fn view(&self) -> PanelView {
        self.view
    }

    pub fn is_widget_ready(&self) -> bool {
        self.widget_ready
    }

    pub fn pending(&self) -> &PendingQuery {
        &self.pending
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.transition.map(|transition| transition.deadline())
    }

    /// Handles one page event. Timers due at `now` fire first.
    pub fn handle(&mut self, event: UiEvent, now: Instant) -> Vec<Effect> {
        let mut out = self.advance(now);
        match event {
            UiEvent::QuickLink { query } => self.quick_link(query, now, &mut out),
            UiEvent::ResultsAppeared => self.results_appeared(&mut out),
            UiEvent::Clear => self.clear(now, &mut out),
            UiEvent::KeyDown { key, focus } => self.key_down(key, focus, now, &mut out),
            UiEvent::WidgetInitialized { location_search } => {
                self.widget_initialized(&location_search, now, &mut out)
            }
            UiEvent::Resize => out.push(Effect::FillWidgetContainer),
            UiEvent::SearchFailed => self.search_failed(&mut out),
        }
        out
    }

    /// Fires every transition whose deadline is at or before `now`.
    pub fn advance(&mut self, now: Instant) -> Vec<Effect> {
        let mut out = Vec::new();
        while let Some(transition) = self.transition {
            if transition.deadline() > now {
                break;
            }
            self.fire(transition, &mut out);
        }
        out
    }

    fn fire(&mut self, transition: Transition, out: &mut Vec<Effect>) {
        self.transition = None;
        match transition {
            Transition::AwaitResults { .. } => {
                debug!("results wait elapsed; revealing results panel");
                self.hide(Panel::Loading, out);
                out.push(Effect::ScrollResultsIntoView);
                self.state = UiState::ShowingResults;
            }
            Transition::FadeOutResults { deadline } => {
                self.hide(Panel::Results, out);
                out.push(Effect::RemoveFade {
                    panel: Panel::Results,
                    fade: Fade::Out,
                });
                self.show(Panel::Features, out);
                out.push(Effect::AddFade {
                    panel: Panel::Features,
                    fade: Fade::In,
                });
                self.state = UiState::Idle;
                self.transition = Some(Transition::FadeInFeatures {
                    deadline: deadline + FADE_DURATION,
                });
            }
            Transition::FadeInFeatures { .. } => {
                out.push(Effect::RemoveFade {
                    panel: Panel::Features,
                    fade: Fade::In,
                });
            }
        }
    }

    fn quick_link(&mut self, query: String, now: Instant, out: &mut Vec<Effect>) {
        if query.trim().is_empty() {
            return;
        }
        if !self.widget_ready {
            debug!(%query, "widget not initialized; deferring query");
            if let Some(previous) = self.pending.offer(query) {
                debug!(%previous, "replaced earlier pending query");
            }
            return;
        }
        self.start_search(query, now, out);
    }

    fn start_search(&mut self, query: String, now: Instant, out: &mut Vec<Effect>) {
        if query.trim().is_empty() {
            return;
        }
        self.cancel_transition(out);
        info!(%query, "executing search");
        let title = format!("Search Results for: \"{query}\"");
        out.push(Effect::SetWidgetQuery { query });
        self.hide(Panel::Features, out);
        self.show(Panel::Loading, out);
        out.push(Effect::SubmitWidgetSearch);
        self.show(Panel::Results, out);
        out.push(Effect::SetResultsTitle { title });
        self.state = UiState::Loading;
        self.transition = Some(Transition::AwaitResults {
            deadline: now + RESULTS_MAX_WAIT,
        });
    }

    fn results_appeared(&mut self, out: &mut Vec<Effect>) {
        match self.transition {
            Some(transition) if transition.is_clearing() => {
                debug!("results notification ignored while clearing");
                return;
            }
            None if self.state == UiState::ShowingResults => return,
            _ => {}
        }
        let awaiting = matches!(self.transition, Some(Transition::AwaitResults { .. }));
        self.transition = None;
        self.hide(Panel::Features, out);
        self.show(Panel::Results, out);
        self.hide(Panel::Loading, out);
        if awaiting {
            out.push(Effect::ScrollResultsIntoView);
        }
        self.state = UiState::ShowingResults;
    }

    fn clear(&mut self, now: Instant, out: &mut Vec<Effect>) {
        if self.transition.is_some_and(|transition| transition.is_clearing()) {
            return;
        }
        self.cancel_transition(out);
        if self.widget_ready {
            out.push(Effect::SetWidgetQuery {
                query: String::new(),
            });
        }
        self.hide(Panel::Loading, out);
        out.push(Effect::AddFade {
            panel: Panel::Results,
            fade: Fade::Out,
        });
        self.transition = Some(Transition::FadeOutResults {
            deadline: now + FADE_DURATION,
        });
    }

    fn key_down(&mut self, key: Key, focus: Focus, now: Instant, out: &mut Vec<Effect>) {
        match key {
            Key::Slash if !focus.is_text_entry() => {
                out.push(Effect::PreventDefault);
                if self.widget_ready {
                    out.push(Effect::FocusWidgetInput);
                }
            }
            Key::Escape if focus == Focus::WidgetInput => {
                self.clear(now, out);
                debug!("search bar cleared from keyboard");
            }
            _ => {}
        }
    }

    fn widget_initialized(&mut self, location_search: &str, now: Instant, out: &mut Vec<Effect>) {
        if self.widget_ready {
            debug!("ignoring repeated widget initialization");
            return;
        }
        self.widget_ready = true;
        if let Some(query) = self.pending.take() {
            info!(%query, "executing pending query");
            self.start_search(query, now, out);
        } else if let Some(query) = query_param(location_search) {
            self.start_search(query, now, out);
        }
    }

    fn search_failed(&mut self, out: &mut Vec<Effect>) {
        self.cancel_transition(out);
        self.hide(Panel::Loading, out);
        self.hide(Panel::Features, out);
        self.show(Panel::Results, out);
        out.push(Effect::ShowSearchError);
        self.state = UiState::ShowingResults;
    }

    /// Drops the in-flight transition, undoing any fade class it left behind.
    fn cancel_transition(&mut self, out: &mut Vec<Effect>) {
        match self.transition.take() {
            Some(Transition::FadeOutResults { .. }) => out.push(Effect::RemoveFade {
                panel: Panel::Results,
                fade: Fade::Out,
            }),
            Some(Transition::FadeInFeatures { .. }) => out.push(Effect::RemoveFade {
                panel: Panel::Features,
                fade: Fade::In,
            }),
            Some(Transition::AwaitResults { .. }) | None => {}
        }
    }

    fn show(&mut self, panel: Panel, out: &mut Vec<Effect>) {
        self.view.set(panel, true);
        out.push(Effect::Show { panel });
    }

    fn hide(&mut self, panel: Panel, out: &mut Vec<Effect>) {
        self.view.set(panel, false);
        out.push(Effect::Hide { panel });
    }
}
