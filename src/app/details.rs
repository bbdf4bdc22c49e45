use eframe::egui::{RichText, Ui};

use super::session::Session;

const EDGE_ROWS: usize = 24;

impl Session {
    /// Vertex the details panel describes: the hovered one, else the first
    /// toggled one.
    pub(super) fn focused_vertex(&self) -> Option<String> {
        let highlighted = self.model.highlighted_vertices();
        highlighted
            .into_iter()
            .next()
            .or_else(|| self.model.toggled_vertices().into_iter().next())
    }

    pub(super) fn draw_details(&self, ui: &mut Ui) {
        ui.heading("Details");

        let Some(name) = self.focused_vertex() else {
            ui.label("Hover or toggle a vertex.");
            return;
        };
        let (Some(index), Some(vertex)) = (self.model.vertex_index(&name), self.model.vertex(&name))
        else {
            ui.label("Vertex no longer exists in the model.");
            return;
        };

        let track = self.model.track().get(index);
        ui.label(RichText::new(name.as_str()).strong());
        ui.label(format!("{} track size: {:.2}", self.model.track().name, track.size));
        ui.label(format!("incident edges: {}", vertex.edges.len()));

        let bundle = self.bundle.borrow();
        if let Some(glyph) = bundle.vertex(&name) {
            ui.label(format!("bundle angle: {:.1}°", glyph.angle));
        }
        let force = self.force.borrow();
        match (force.vertex(&name), force.position(index)) {
            (Some(glyph), Some(position)) => {
                ui.label(format!(
                    "force position: ({:.0}, {:.0}), radius {:.1}",
                    position.x, position.y, glyph.radius
                ));
            }
            _ => {
                ui.label("not in the force layout");
            }
        }

        ui.separator();
        ui.label(RichText::new("Edges in the selected frames").strong());
        for &edge_index in vertex.edges.iter().take(EDGE_ROWS) {
            let edge = &self.model.edges()[edge_index];
            let other = if edge.v1 == index { edge.v2 } else { edge.v1 };
            let width = bundle.edge(edge_index).map_or(0.0, |scene| scene.stroke_width);
            ui.label(format!(
                "{} - {}: {} frames, width {width:.1}",
                name,
                self.model.vertex_name(other),
                self.model.frame_count(edge)
            ));
        }
        if vertex.edges.len() > EDGE_ROWS {
            ui.small(format!("{} more", vertex.edges.len() - EDGE_ROWS));
        }
    }
}
