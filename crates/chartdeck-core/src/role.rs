#![forbid(unsafe_code)]

//! Structural roles inside an entry row, and delegated event resolution.
//!
//! Hosts bind one listener per DOM event type on the list container. When an
//! event fires they report the nearest `data-role` of the target, the id of
//! the enclosing entry row, and the control's value; [`resolve`] turns that
//! into a [`Gesture`]. Replacing the container's content therefore never
//! requires re-binding anything.

use crate::entry::{ChartType, MoveDirection};
use crate::gesture::Gesture;

/// Attribute carrying a node's structural role.
pub const ROLE_ATTRIBUTE: &str = "data-role";
/// Role value of an entry row.
pub const ENTRY_ROLE: &str = "entry";
/// Role value of the empty-state placeholder.
pub const EMPTY_STATE_ROLE: &str = "empty-state";

/// DOM event types the container listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEvent {
    Click,
    Change,
}

impl DomEvent {
    pub const ALL: [Self; 2] = [Self::Click, Self::Change];

    /// DOM event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Change => "change",
        }
    }
}

/// Interactive control inside an entry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The `<select>` choosing the chart type.
    ChartType,
    /// The clickable title label.
    ChartName,
    MoveUp,
    MoveDown,
    Delete,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::ChartType,
        Self::ChartName,
        Self::MoveUp,
        Self::MoveDown,
        Self::Delete,
    ];

    /// Value of the `data-role` attribute.
    #[must_use]
    pub const fn data_role(self) -> &'static str {
        match self {
            Self::ChartType => "chart-type",
            Self::ChartName => "chart-name",
            Self::MoveUp => "move-up",
            Self::MoveDown => "move-down",
            Self::Delete => "delete",
        }
    }

    #[must_use]
    pub fn from_data_role(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.data_role() == value)
    }

    /// The event type this control reacts to.
    #[must_use]
    pub const fn event(self) -> DomEvent {
        match self {
            Self::ChartType => DomEvent::Change,
            _ => DomEvent::Click,
        }
    }
}

/// Resolve a delegated container event into a gesture.
///
/// Returns `None` when the target has no known role, is not inside an entry
/// row, or the event type does not match the role (e.g. a click on the
/// select control).
#[must_use]
pub fn resolve(
    event: DomEvent,
    role: Option<&str>,
    row_id: Option<&str>,
    value: Option<&str>,
) -> Option<Gesture> {
    let role = Role::from_data_role(role?)?;
    if role.event() != event {
        return None;
    }
    let title = row_id.filter(|id| !id.is_empty())?.to_string();

    Some(match role {
        Role::ChartType => Gesture::SetChartType {
            title,
            chart_type: ChartType::new(value?),
        },
        Role::ChartName => Gesture::Select { title },
        Role::MoveUp => Gesture::Move {
            title,
            direction: MoveDirection::Up,
        },
        Role::MoveDown => Gesture::Move {
            title,
            direction: MoveDirection::Down,
        },
        Role::Delete => Gesture::Delete { title },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn data_roles_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::from_data_role(role.data_role()), Some(role));
        }
        assert_eq!(Role::from_data_role("entry"), None);
    }

    #[test]
    fn click_on_arrows_resolves_moves() {
        assert_eq!(
            resolve(DomEvent::Click, Some("move-up"), Some("B"), None),
            Some(Gesture::Move {
                title: "B".into(),
                direction: MoveDirection::Up
            })
        );
        assert_eq!(
            resolve(DomEvent::Click, Some("delete"), Some("B"), None),
            Some(Gesture::Delete { title: "B".into() })
        );
    }

    #[test]
    fn change_on_select_carries_value() {
        assert_eq!(
            resolve(DomEvent::Change, Some("chart-type"), Some("A"), Some("xbar")),
            Some(Gesture::SetChartType {
                title: "A".into(),
                chart_type: ChartType::new("xbar"),
            })
        );
        assert_eq!(resolve(DomEvent::Change, Some("chart-type"), Some("A"), None), None);
    }

    #[test]
    fn mismatched_or_orphan_targets_are_ignored() {
        assert_eq!(resolve(DomEvent::Click, Some("chart-type"), Some("A"), None), None);
        assert_eq!(resolve(DomEvent::Change, Some("delete"), Some("A"), None), None);
        assert_eq!(resolve(DomEvent::Click, Some("delete"), None, None), None);
        assert_eq!(resolve(DomEvent::Click, Some("delete"), Some(""), None), None);
        assert_eq!(resolve(DomEvent::Click, None, Some("A"), None), None);
    }
}
