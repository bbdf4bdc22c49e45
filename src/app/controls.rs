use eframe::egui::{self, Color32, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::warn;

use crate::views::ViewAction;

use super::ViewKind;
use super::session::{FrameMode, Session};

const SEARCH_RESULT_ROWS: usize = 200;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Vertex names matching `query`, best match first; every name when the query
/// is blank.
pub(super) fn search_vertices<'a>(names: impl Iterator<Item = &'a str>, query: &str) -> Vec<&'a str> {
    let query = query.trim();
    if query.is_empty() {
        return names.collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = names
        .filter_map(|name| fuzzy_match_score(&matcher, name, query).map(|score| (score, name)))
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().map(|(_, name)| name).collect()
}

impl Session {
    pub(super) fn draw_controls(&mut self, ui: &mut Ui) {
        self.draw_frame_controls(ui);
        ui.separator();
        self.draw_track_controls(ui);
        ui.separator();
        if self.active_view == ViewKind::Force {
            self.draw_force_controls(ui);
            ui.separator();
        }
        self.draw_details(ui);
        ui.separator();
        self.draw_vertex_search(ui);

        if let Some(error) = &self.last_error {
            ui.separator();
            ui.label(RichText::new(error).color(Color32::from_rgb(230, 110, 100)));
        }
    }

    fn draw_frame_controls(&mut self, ui: &mut Ui) {
        ui.heading("Frames");
        let last = self.model.total_frames().saturating_sub(1);
        let mut changed = false;

        ui.horizontal(|ui| {
            changed |= ui
                .radio_value(&mut self.frame_mode, FrameMode::Single, "Single")
                .changed();
            changed |= ui
                .radio_value(&mut self.frame_mode, FrameMode::Range, "Range")
                .changed();
        });

        let begin_label = match self.frame_mode {
            FrameMode::Single => "frame",
            FrameMode::Range => "begin",
        };
        changed |= ui
            .add(egui::Slider::new(&mut self.frame_begin, 0..=last).text(begin_label))
            .changed();
        if self.frame_mode == FrameMode::Range {
            changed |= ui
                .add(egui::Slider::new(&mut self.frame_end, 0..=last).text("end"))
                .changed();
        }

        if ui.button("All frames").clicked() {
            self.frame_mode = FrameMode::Range;
            self.frame_begin = 0;
            self.frame_end = last;
            changed = true;
        }

        if changed {
            self.apply_frames();
        }
    }

    fn draw_track_controls(&mut self, ui: &mut Ui) {
        ui.heading("Track");
        let active = self.model.active_track();
        let mut selected = active;

        egui::ComboBox::from_id_salt("track")
            .selected_text(self.model.track().name.as_str())
            .show_ui(ui, |ui| {
                for (index, track) in self.model.tracks().iter().enumerate() {
                    ui.selectable_value(&mut selected, index, track.name.as_str());
                }
            });

        if selected != active
            && let Err(error) = self.model.set_track(selected)
        {
            warn!(%error, "track switch rejected");
            self.last_error = Some(error.to_string());
        }
    }

    fn draw_force_controls(&mut self, ui: &mut Ui) {
        ui.heading("Force layout");
        let mut force = self.force.borrow_mut();
        let simulation = force.simulation_mut();

        let status = if simulation.is_running() {
            format!("running (alpha {:.3})", simulation.state().alpha)
        } else {
            "settled".to_owned()
        };
        ui.label(format!("{status}, {} ticks", simulation.ticks()));
        ui.label(format!("pinned vertices: {}", simulation.pins().len()));

        ui.horizontal(|ui| {
            if ui.button("Halt").clicked() {
                simulation.halt();
            }
            if ui.button("Reheat").clicked() {
                simulation.reheat();
                ui.ctx().request_repaint();
            }
        });
    }

    fn draw_vertex_search(&mut self, ui: &mut Ui) {
        ui.heading("Vertices");
        ui.horizontal(|ui| {
            ui.label("Search");
            ui.text_edit_singleline(&mut self.search);
        });

        let toggled = self.model.toggled_vertices();
        ui.horizontal(|ui| {
            ui.label(format!("toggled: {}", toggled.len()));
            if ui
                .add_enabled(!toggled.is_empty(), egui::Button::new("Clear"))
                .clicked()
            {
                let actions = toggled
                    .iter()
                    .map(|name| ViewAction::Toggle { name: name.clone() })
                    .collect::<Vec<_>>();
                self.apply_actions(actions);
            }
        });

        let names = self
            .model
            .vertices()
            .iter()
            .map(|vertex| vertex.name.as_str());
        let matches = search_vertices(names, &self.search)
            .into_iter()
            .take(SEARCH_RESULT_ROWS)
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let mut actions = Vec::new();
        egui::ScrollArea::vertical()
            .id_salt("vertex_search")
            .show(ui, |ui| {
                for name in &matches {
                    let is_toggled = self.model.vertex_toggled(name);
                    let mut text = RichText::new(name.as_str());
                    if self.model.vertex_highlighted(name) {
                        text = text.strong();
                    }
                    if ui.selectable_label(is_toggled, text).clicked() {
                        actions.push(ViewAction::Toggle { name: name.clone() });
                    }
                }
            });
        self.apply_actions(actions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_lists_everything_in_order() {
        let names = ["beta", "alpha", "gamma"];
        assert_eq!(search_vertices(names.into_iter(), "  "), ["beta", "alpha", "gamma"]);
    }

    #[test]
    fn fuzzy_query_filters_and_ranks() {
        let names = ["ADRB2", "ADRA1A", "CHRM1", "adrb1"];
        let found = search_vertices(names.into_iter(), "adrb");

        assert!(found.contains(&"ADRB2"));
        assert!(found.contains(&"adrb1"));
        assert!(!found.contains(&"CHRM1"));
    }
}
