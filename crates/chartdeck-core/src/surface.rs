#![forbid(unsafe_code)]

//! Rendered surfaces the controller mutates.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ListSurface                            │
//! │   - ordered entry rows, keyed by title                        │
//! │   - O(1) node surgery: swap adjacent rows, remove one row     │
//! │   - full replacement from a server fragment                   │
//! └──────────────────────────────────────────────────────────────┘
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PlotSurface                            │
//! │   - the single viewer region: title label + plot reference    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `chartdeck-web` implements both over real DOM nodes. [`MemoryListSurface`]
//! and [`MemoryPlotSurface`] keep the same contract in memory and expose
//! their serialized markup so tests can assert that a failed gesture left
//! the surface byte-for-byte unchanged.
//!
//! # Invariants
//!
//! 1. The empty-state placeholder and entry rows never coexist.
//! 2. [`ListSurface::swap_adjacent`] only accepts rows that are adjacent in
//!    the given order; every other row keeps its position.

use std::fmt;

use std::collections::BTreeMap;

use crate::entry::ChartType;
use crate::fragment::{self, EMPTY_STATE_HTML, ScannedRow};

/// Errors raised by surface operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// No row with this id exists.
    UnknownRow(String),
    /// The two rows are not immediate siblings in the stated order.
    NotAdjacent { earlier: String, later: String },
    /// The row's type control offers no option with this value.
    UnknownOption { id: String, value: String },
    /// The host DOM rejected the operation.
    Dom(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRow(id) => write!(f, "no row with id {id:?}"),
            Self::NotAdjacent { earlier, later } => {
                write!(f, "rows {earlier:?} and {later:?} are not adjacent")
            }
            Self::UnknownOption { id, value } => {
                write!(f, "row {id:?} offers no chart type {value:?}")
            }
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// The ordered list container.
pub trait ListSurface {
    /// Row ids in display order. The placeholder is not a row.
    fn row_ids(&self) -> Vec<String>;

    fn row_count(&self) -> usize {
        self.row_ids().len()
    }

    fn contains(&self, id: &str) -> bool {
        self.row_ids().iter().any(|row| row == id)
    }

    /// Id of the row immediately before `id`.
    fn previous_sibling(&self, id: &str) -> Option<String> {
        let ids = self.row_ids();
        let idx = ids.iter().position(|row| row == id)?;
        idx.checked_sub(1).map(|i| ids[i].clone())
    }

    /// Id of the row immediately after `id`.
    fn next_sibling(&self, id: &str) -> Option<String> {
        let ids = self.row_ids();
        let idx = ids.iter().position(|row| row == id)?;
        ids.get(idx + 1).cloned()
    }

    /// Exchange two adjacent rows: detach `earlier` and reinsert it right
    /// after `later`.
    fn swap_adjacent(&mut self, earlier: &str, later: &str) -> Result<(), SurfaceError>;

    /// Remove one row.
    fn remove_row(&mut self, id: &str) -> Result<(), SurfaceError>;

    /// Replace the container's entire content with a server fragment.
    fn replace_contents(&mut self, html: &str) -> Result<(), SurfaceError>;

    fn is_showing_empty_state(&self) -> bool;

    /// Chart type last confirmed for a row: the option marked `selected` in
    /// its markup, not whatever the control currently displays.
    fn chart_type(&self, id: &str) -> Option<ChartType>;

    /// Mark `chart_type` as the row's confirmed type and reset the control
    /// to show it.
    fn set_chart_type(&mut self, id: &str, chart_type: &ChartType) -> Result<(), SurfaceError>;

    /// Install the "nothing loaded" placeholder.
    fn show_empty_state(&mut self) -> Result<(), SurfaceError> {
        self.replace_contents(EMPTY_STATE_HTML)
    }
}

/// The single viewer region.
pub trait PlotSurface {
    /// Show the plot for `title`, replacing whatever was displayed.
    fn show_plot(&mut self, title: &str, plot_url: &str) -> Result<(), SurfaceError>;

    /// Show the initial prompt.
    fn show_prompt(&mut self) -> Result<(), SurfaceError>;
}

/// In-memory list container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryListSurface {
    rows: Vec<ScannedRow>,
    empty_state: bool,
    /// Values picked in a row's type control and not yet confirmed. Like a
    /// live `<select>` value, they are not part of the markup.
    picked: BTreeMap<String, String>,
}

impl MemoryListSurface {
    /// An empty container (neither rows nor placeholder).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A container initialised from server markup.
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        let scanned = fragment::scan(html);
        Self {
            empty_state: scanned.empty_state && scanned.rows.is_empty(),
            rows: scanned.rows,
            picked: BTreeMap::new(),
        }
    }

    /// Change a row's type control the way a user would, without touching
    /// the markup.
    pub fn pick(&mut self, id: &str, value: &str) -> Result<(), SurfaceError> {
        self.index_of(id)?;
        self.picked.insert(id.to_string(), value.to_string());
        Ok(())
    }

    /// Value the row's type control currently displays.
    #[must_use]
    pub fn control_value(&self, id: &str) -> Option<String> {
        self.picked
            .get(id)
            .cloned()
            .or_else(|| self.chart_type(id).map(|ty| ty.to_string()))
    }

    /// Serialized container content.
    #[must_use]
    pub fn markup(&self) -> String {
        if self.empty_state {
            return EMPTY_STATE_HTML.to_string();
        }
        self.rows
            .iter()
            .map(|row| row.markup.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn index_of(&self, id: &str) -> Result<usize, SurfaceError> {
        self.rows
            .iter()
            .position(|row| row.id == id)
            .ok_or_else(|| SurfaceError::UnknownRow(id.to_string()))
    }
}

impl ListSurface for MemoryListSurface {
    fn row_ids(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn swap_adjacent(&mut self, earlier: &str, later: &str) -> Result<(), SurfaceError> {
        let a = self.index_of(earlier)?;
        let b = self.index_of(later)?;
        if b != a + 1 {
            return Err(SurfaceError::NotAdjacent {
                earlier: earlier.to_string(),
                later: later.to_string(),
            });
        }
        let node = self.rows.remove(a);
        // `later` now sits at `a`; reinsert right after it.
        self.rows.insert(a + 1, node);
        Ok(())
    }

    fn remove_row(&mut self, id: &str) -> Result<(), SurfaceError> {
        let idx = self.index_of(id)?;
        self.rows.remove(idx);
        self.picked.remove(id);
        Ok(())
    }

    fn replace_contents(&mut self, html: &str) -> Result<(), SurfaceError> {
        *self = Self::from_html(html);
        Ok(())
    }

    fn is_showing_empty_state(&self) -> bool {
        self.empty_state
    }

    fn chart_type(&self, id: &str) -> Option<ChartType> {
        let row = self.rows.iter().find(|row| row.id == id)?;
        fragment::selected_option(&row.markup).map(ChartType::new)
    }

    fn set_chart_type(&mut self, id: &str, chart_type: &ChartType) -> Result<(), SurfaceError> {
        let idx = self.index_of(id)?;
        let row = &mut self.rows[idx];
        row.markup = fragment::with_selected_option(&row.markup, chart_type.as_str()).ok_or_else(
            || SurfaceError::UnknownOption {
                id: id.to_string(),
                value: chart_type.to_string(),
            },
        )?;
        self.picked.remove(id);
        Ok(())
    }
}

/// Prompt shown by an empty viewer.
pub const PLOT_PROMPT: &str = "Select a chart to view its plot";

/// In-memory viewer region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPlotSurface {
    shown: Option<(String, String)>,
}

impl MemoryPlotSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the title label (empty while the prompt is shown).
    #[must_use]
    pub fn title_label(&self) -> &str {
        self.shown.as_ref().map_or("", |(title, _)| title)
    }

    #[must_use]
    pub fn plot_url(&self) -> Option<&str> {
        self.shown.as_ref().map(|(_, url)| url.as_str())
    }

    /// Serialized region content.
    #[must_use]
    pub fn markup(&self) -> String {
        match &self.shown {
            None => format!(
                "<h2 id=\"make_plot-title\"></h2>\n<p class=\"prompt\">{PLOT_PROMPT}</p>"
            ),
            Some((title, url)) => format!(
                "<h2 id=\"make_plot-title\">{}</h2>\n<img class=\"plot\" src=\"{}\" alt=\"{}\">",
                fragment::escape(title),
                fragment::escape(url),
                fragment::escape(title),
            ),
        }
    }
}

impl PlotSurface for MemoryPlotSurface {
    fn show_plot(&mut self, title: &str, plot_url: &str) -> Result<(), SurfaceError> {
        self.shown = Some((title.to_string(), plot_url.to_string()));
        Ok(())
    }

    fn show_prompt(&mut self) -> Result<(), SurfaceError> {
        self.shown = None;
        Ok(())
    }
}
