pub mod bundle;
pub mod force;
mod render_utils;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use eframe::egui::Color32;

use crate::model::{GraphModel, ModelError};

pub use bundle::{BundleOptions, HierarchicalBundleView};
pub use force::{ForceLayoutView, ForceOptions};

pub(crate) const DEFAULT_EXTENT: f32 = 640.0;
pub(crate) const HIGHLIGHT_TINT: Color32 = Color32::from_rgb(79, 87, 165);
pub(crate) const ACTIVE_EDGE_OPACITY: f32 = 1.0;

/// Horizontal extent a view is mounted with. Both views are square.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extent {
    Fixed(f32),
    FitWidth,
}

impl Extent {
    pub fn resolve(self, available_width: f32) -> f32 {
        match self {
            Self::Fixed(width) => width,
            Self::FitWidth => available_width,
        }
        .max(1.0)
    }
}

impl FromStr for Extent {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("auto") {
            return Ok(Self::FitWidth);
        }

        match value.parse::<f32>() {
            Ok(width) if width.is_finite() && width > 0.0 => Ok(Self::Fixed(width)),
            _ => Err(format!("expected a positive pixel width or `auto`, got `{value}`")),
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(width) => write!(f, "{width}px"),
            Self::FitWidth => f.write_str("auto"),
        }
    }
}

/// Container binding for a view: where it is shown and how wide it is.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewMount {
    pub id: String,
    pub extent: Extent,
}

impl ViewMount {
    pub fn new(id: impl Into<String>, extent: Extent) -> Self {
        Self {
            id: id.into(),
            extent,
        }
    }

    pub(crate) fn initial_width(&self) -> f32 {
        self.extent.resolve(DEFAULT_EXTENT)
    }
}

/// Model mutation requested by pointer interaction inside a view. Views never
/// write the model themselves; the host applies these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewAction {
    Highlight { name: String, highlighted: bool },
    Toggle { name: String },
}

impl ViewAction {
    pub fn apply(&self, model: &mut GraphModel) -> Result<(), ModelError> {
        match self {
            Self::Highlight { name, highlighted } => {
                model.set_vertex_highlighted(name, *highlighted)
            }
            Self::Toggle { name } => {
                let toggled = model.vertex_toggled(name);
                model.set_vertex_toggled(name, !toggled)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabelStyle {
    pub bold: bool,
    pub tinted: bool,
}

/// Names drawn with emphasis after a highlight change: highlighted or toggled.
pub(crate) fn emphasized_names<'a>(
    model: &'a GraphModel,
    highlighted: &'a [String],
) -> HashSet<&'a str> {
    let toggled = model
        .vertices()
        .iter()
        .map(|vertex| vertex.name.as_str())
        .filter(|name| model.vertex_toggled(name));
    highlighted.iter().map(String::as_str).chain(toggled).collect()
}

pub(crate) fn edge_opacity(model: &GraphModel, v1: usize, v2: usize, inactive_opacity: f32) -> f32 {
    if model.vertex_toggled(model.vertex_name(v1)) || model.vertex_toggled(model.vertex_name(v2)) {
        ACTIVE_EDGE_OPACITY
    } else {
        inactive_opacity
    }
}

/// Tracks which vertex the pointer rests on and turns enter/leave into
/// highlight actions.
#[derive(Clone, Debug, Default)]
pub(crate) struct HoverTracker {
    current: Option<String>,
}

impl HoverTracker {
    pub(crate) fn update(&mut self, hovered: Option<&str>, actions: &mut Vec<ViewAction>) {
        if self.current.as_deref() == hovered {
            return;
        }

        if let Some(name) = self.current.take() {
            actions.push(ViewAction::Highlight {
                name,
                highlighted: false,
            });
        }
        if let Some(name) = hovered {
            actions.push(ViewAction::Highlight {
                name: name.to_owned(),
                highlighted: true,
            });
            self.current = Some(name.to_owned());
        }
    }

    /// Leaves the current vertex, as when the view stops being shown.
    pub(crate) fn clear(&mut self, actions: &mut Vec<ViewAction>) {
        self.update(None, actions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::scenario_model;

    #[test]
    fn extent_parses_auto_and_pixels() {
        assert_eq!("auto".parse(), Ok(Extent::FitWidth));
        assert_eq!("480".parse(), Ok(Extent::Fixed(480.0)));
        assert!("-3".parse::<Extent>().is_err());
        assert_eq!(Extent::FitWidth.resolve(312.0), 312.0);
        assert_eq!(Extent::Fixed(200.0).resolve(900.0), 200.0);
    }

    #[test]
    fn hover_tracker_emits_leave_before_enter() {
        let mut tracker = HoverTracker::default();
        let mut actions = Vec::new();

        tracker.update(Some("A"), &mut actions);
        tracker.update(Some("A"), &mut actions);
        tracker.update(Some("B"), &mut actions);
        tracker.update(None, &mut actions);

        assert_eq!(
            actions,
            vec![
                ViewAction::Highlight { name: "A".to_owned(), highlighted: true },
                ViewAction::Highlight { name: "A".to_owned(), highlighted: false },
                ViewAction::Highlight { name: "B".to_owned(), highlighted: true },
                ViewAction::Highlight { name: "B".to_owned(), highlighted: false },
            ]
        );
    }

    #[test]
    fn clearing_the_tracker_leaves_once() {
        let mut tracker = HoverTracker::default();
        let mut actions = Vec::new();

        tracker.update(Some("A"), &mut actions);
        actions.clear();
        tracker.clear(&mut actions);
        tracker.clear(&mut actions);

        assert_eq!(
            actions,
            vec![ViewAction::Highlight { name: "A".to_owned(), highlighted: false }]
        );
    }

    #[test]
    fn toggle_action_flips_membership() {
        let mut model = scenario_model();
        let action = ViewAction::Toggle { name: "C".to_owned() };

        action.apply(&mut model).unwrap();
        assert!(model.vertex_toggled("C"));
        action.apply(&mut model).unwrap();
        assert!(!model.vertex_toggled("C"));
    }
}
