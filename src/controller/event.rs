use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that happened on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiEvent {
    /// A quick link carrying a canned query was clicked.
    QuickLink { query: String },
    /// The widget's results wrapper became visible in the DOM.
    ResultsAppeared,
    /// The clear button was pressed.
    Clear,
    /// A key went down anywhere on the page.
    KeyDown {
        key: Key,
        #[serde(default)]
        focus: Focus,
    },
    /// The hosted widget finished initializing. `location_search` is the
    /// page URL's query string, with or without the leading `?`.
    WidgetInitialized {
        #[serde(default)]
        location_search: String,
    },
    /// The window was resized.
    Resize,
    /// The host observed a failed search in the widget.
    SearchFailed,
}

/// The `key` value of a keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Slash,
    Escape,
    Other(String),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        match value {
            "/" => Key::Slash,
            "Escape" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        match value.as_str() {
            "/" => Key::Slash,
            "Escape" => Key::Escape,
            _ => Key::Other(value),
        }
    }
}

impl From<Key> for String {
    fn from(value: Key) -> Self {
        match value {
            Key::Slash => "/".to_string(),
            Key::Escape => "Escape".to_string(),
            Key::Other(other) => other,
        }
    }
}

/// Which element held focus when a key went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    #[default]
    Body,
    WidgetInput,
    TextInput,
    TextArea,
    Other,
}

impl Focus {
    /// True for elements that accept typed text. The widget input is one.
    pub fn is_text_entry(self) -> bool {
        matches!(self, Focus::WidgetInput | Focus::TextInput | Focus::TextArea)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Features,
    Results,
    Loading,
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Panel::Features => write!(f, "features"),
            Panel::Results => write!(f, "results"),
            Panel::Loading => write!(f, "loading"),
        }
    }
}

/// CSS transition classes toggled on panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fade {
    In,
    Out,
}

impl Fade {
    pub fn css_class(self) -> &'static str {
        match self {
            Fade::In => "fade-in",
            Fade::Out => "fade-out",
        }
    }
}

/// A change the host must apply to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    SetWidgetQuery { query: String },
    SubmitWidgetSearch,
    FocusWidgetInput,
    PreventDefault,
    Show { panel: Panel },
    Hide { panel: Panel },
    AddFade { panel: Panel, fade: Fade },
    RemoveFade { panel: Panel, fade: Fade },
    SetResultsTitle { title: String },
    ScrollResultsIntoView,
    FillWidgetContainer,
    ShowSearchError,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetWidgetQuery { query } => write!(f, "set widget query {query:?}"),
            Effect::SubmitWidgetSearch => write!(f, "submit widget search"),
            Effect::FocusWidgetInput => write!(f, "focus widget input"),
            Effect::PreventDefault => write!(f, "prevent default"),
            Effect::Show { panel } => write!(f, "show {panel}"),
            Effect::Hide { panel } => write!(f, "hide {panel}"),
            Effect::AddFade { panel, fade } => write!(f, "add .{} to {panel}", fade.css_class()),
            Effect::RemoveFade { panel, fade } => {
                write!(f, "remove .{} from {panel}", fade.css_class())
            }
            Effect::SetResultsTitle { title } => write!(f, "set results title {title:?}"),
            Effect::ScrollResultsIntoView => write!(f, "scroll results into view"),
            Effect::FillWidgetContainer => write!(f, "fill widget container width"),
            Effect::ShowSearchError => write!(f, "show search error banner"),
        }
    }
}

/// Visibility of the three panels the controller owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub features: bool,
    pub results: bool,
    pub loading: bool,
}

impl Default for PanelView {
    fn default() -> Self {
        Self {
            features: true,
            results: false,
            loading: false,
        }
    }
}

impl PanelView {
    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Features => self.features,
            Panel::Results => self.results,
            Panel::Loading => self.loading,
        }
    }

    pub(crate) fn set(&mut self, panel: Panel, visible: bool) {
        match panel {
            Panel::Features => self.features = visible,
            Panel::Results => self.results = visible,
            Panel::Loading => self.loading = visible,
        }
    }
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |visible: bool| if visible { "shown" } else { "hidden" };
        write!(
            f,
            "features {}, results {}, loading {}",
            label(self.features),
            label(self.results),
            label(self.loading)
        )
    }
}
