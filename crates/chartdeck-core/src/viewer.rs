#![forbid(unsafe_code)]

//! Chart viewer state machine.
//!
//! ```text
//!            show(Y)                 show(Y)
//!   Blank ───────────▶ Showing(X) ───────────▶ Showing(Y)
//!     ▲                    │
//!     └────── clear() ─────┘
//! ```
//!
//! Failed selections cause no transition. The controller owns the value and
//! passes it where "is this entry currently visible?" must be answered; it is
//! never read back from rendered markup.

/// What the viewer region currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewerState {
    /// Initial state: a prompt, no plot.
    #[default]
    Blank,
    /// A plot for `title` is displayed.
    Showing { title: String, plot_url: String },
}

impl ViewerState {
    /// Title of the displayed plot.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Showing { title, .. } => Some(title),
        }
    }

    #[must_use]
    pub fn plot_url(&self) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Showing { plot_url, .. } => Some(plot_url),
        }
    }

    /// Whether the open plot belongs to `title`.
    #[must_use]
    pub fn is_showing(&self, title: &str) -> bool {
        self.title() == Some(title)
    }

    /// Transition to `Showing(title)`.
    pub fn show(&mut self, title: impl Into<String>, plot_url: impl Into<String>) {
        *self = Self::Showing {
            title: title.into(),
            plot_url: plot_url.into(),
        };
    }

    /// Return to `Blank`.
    pub fn clear(&mut self) {
        *self = Self::Blank;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_blank_and_switches_between_titles() {
        let mut state = ViewerState::default();
        assert_eq!(state, ViewerState::Blank);
        assert!(!state.is_showing("Revenue"));

        state.show("Revenue", "/Revenue_bar.png");
        assert!(state.is_showing("Revenue"));
        assert_eq!(state.plot_url(), Some("/Revenue_bar.png"));

        state.show("Costs", "/Costs_bar.png");
        assert!(!state.is_showing("Revenue"));
        assert_eq!(state.title(), Some("Costs"));

        state.clear();
        assert_eq!(state, ViewerState::Blank);
    }
}
