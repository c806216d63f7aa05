use std::collections::HashMap;

use serde::Serialize;

use crate::fragment::Row;

/// A panel is in exactly one of these at any time. Transitions happen only
/// when the corresponding server response has arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Loaded,
    Unloaded,
}

impl PanelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelState::Loaded => "loaded",
            PanelState::Unloaded => "unloaded",
        }
    }
}

/// Whether a load or an unload should be issued for a panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleDirection {
    Load,
    Unload,
}

/// Request-activity indicator for a panel. `Error` replaces the original
/// UI's forever-spinning indicator on failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Idle,
    Loading,
    Error,
}

#[derive(Clone, Debug)]
pub struct Panel {
    pub name: String,
    pub state: PanelState,
    pub indicator: Indicator,
    pub rows: Vec<Row>,
    in_flight: bool,
}

impl Panel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: PanelState::Unloaded,
            indicator: Indicator::Idle,
            rows: Vec::new(),
            in_flight: false,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Marks the panel busy and picks the request direction from the current
    /// state. Returns `None` if a request is already in flight (a rapid
    /// second click), in which case nothing may be issued.
    pub fn begin_toggle(&mut self) -> Option<ToggleDirection> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        self.indicator = Indicator::Loading;
        Some(match self.state {
            PanelState::Unloaded => ToggleDirection::Load,
            PanelState::Loaded => ToggleDirection::Unload,
        })
    }

    /// Confirms a toggle: installs the parsed rows, flips the state, and
    /// returns the indicator to idle.
    pub fn apply_fragment(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.state = match self.state {
            PanelState::Unloaded => PanelState::Loaded,
            PanelState::Loaded => PanelState::Unloaded,
        };
        self.indicator = Indicator::Idle;
        self.in_flight = false;
    }

    /// Records a failed toggle. The state stays where it was; only the
    /// indicator changes.
    pub fn fail(&mut self) {
        self.indicator = Indicator::Error;
        self.in_flight = false;
    }
}

/// The registry of category panels, keyed by category name. Registration
/// order is preserved for display.
#[derive(Clone, Debug, Default)]
pub struct Shelf {
    order: Vec<String>,
    panels: HashMap<String, Panel>,
}

impl Shelf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str) {
        if !self.panels.contains_key(name) {
            self.order.push(name.to_string());
            self.panels.insert(name.to_string(), Panel::new(name));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Panel> {
        self.panels.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Panel> {
        self.panels.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.order.iter().filter_map(|name| self.panels.get(name))
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All rows of currently loaded panels, in shelf order. This is what the
    /// search filter indexes after each toggle.
    pub fn loaded_rows(&self) -> Vec<Row> {
        self.panels()
            .filter(|p| p.state == PanelState::Loaded)
            .flat_map(|p| p.rows.iter().cloned())
            .collect()
    }
}

/// Holder for the page's root content. Quit replaces it wholesale, which
/// also drops every panel.
#[derive(Clone, Debug, Default)]
pub struct Page {
    root_html: Option<String>,
}

impl Page {
    pub fn replace_root(&mut self, html: String, shelf: &mut Shelf) {
        self.root_html = Some(html);
        *shelf = Shelf::new();
    }

    pub fn root_html(&self) -> Option<&str> {
        self.root_html.as_deref()
    }
}
