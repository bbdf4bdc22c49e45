use eframe::egui::epaint::{Mesh, TextShape};
use eframe::egui::{
    CursorIcon, FontId, Painter, Pos2, Sense, Shape, Stroke, Ui, Vec2, vec2,
};

use crate::model::GraphModel;

use super::super::ViewAction;
use super::super::render_utils::{draw_background, label_color, local_pointer, with_opacity};
use super::geometry::{leaf_slot, polar, to_polar};
use super::{BundleVertex, HierarchicalBundleView, TrackArc};

const ARC_SEGMENTS: usize = 6;

impl HierarchicalBundleView {
    /// Paints the retained scene and turns pointer input into model actions.
    pub fn show(&mut self, ui: &mut Ui, model: &GraphModel) -> Vec<ViewAction> {
        let width = self.mount.extent.resolve(ui.available_width());
        self.resize(model, width);

        let (rect, response) = ui.allocate_exact_size(vec2(width, width), Sense::click());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);
        let center = rect.center();

        for edge in &self.edges {
            if edge.stroke_width <= 0.0 || edge.path.len() < 2 {
                continue;
            }
            let points = edge.path.iter().map(|&point| center + point).collect::<Vec<_>>();
            let color = with_opacity(edge.color, edge.opacity);
            painter.add(Shape::line(points, Stroke::new(edge.stroke_width, color)));
        }

        for arc in &self.tracks {
            paint_track_arc(&painter, center, arc, self.layout.arc_half_angle);
        }

        let font = FontId::proportional(self.layout.text_height * 0.8);
        for vertex in &self.vertices {
            paint_radial_label(&painter, center, self.layout.text_radius, vertex, font.clone());
        }

        let hovered = local_pointer(rect, response.hover_pos())
            .map(|local| local - rect.size() / 2.0)
            .and_then(|offset| self.hit_test(offset))
            .map(str::to_owned);
        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = CursorIcon::PointingHand);
        }

        let mut actions = self.set_hovered(hovered.as_deref());
        if response.clicked()
            && let Some(name) = hovered
        {
            actions.push(ViewAction::Toggle { name });
        }
        actions
    }

    /// Vertex whose label or track arc lies under `offset` from the centre.
    pub fn hit_test(&self, offset: Vec2) -> Option<&str> {
        let (angle, radius) = to_polar(offset);
        if radius < self.layout.track_radius || radius > self.layout.width / 2.0 {
            return None;
        }
        let slot = leaf_slot(angle, self.vertices.len())?;
        self.vertices.get(slot).map(|vertex| vertex.name.as_str())
    }
}

fn paint_track_arc(painter: &Painter, center: Pos2, arc: &TrackArc, half_angle: f32) {
    if arc.outer_radius - arc.inner_radius < 0.01 {
        return;
    }

    let half_degrees = half_angle.to_degrees();
    let mut mesh = Mesh::default();
    for step in 0..=ARC_SEGMENTS {
        let angle = arc.angle - half_degrees + 2.0 * half_degrees * step as f32 / ARC_SEGMENTS as f32;
        mesh.colored_vertex(center + polar(angle, arc.inner_radius), arc.color);
        mesh.colored_vertex(center + polar(angle, arc.outer_radius), arc.color);
    }
    for step in 0..ARC_SEGMENTS as u32 {
        let base = step * 2;
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base + 1, base + 3, base + 2);
    }
    painter.add(Shape::mesh(mesh));
}

/// Labels on the right half read outwards from the ring; on the left half they
/// are flipped so they stay upright and end at the ring.
fn paint_radial_label(painter: &Painter, center: Pos2, radius: f32, vertex: &BundleVertex, font: FontId) {
    let color = label_color(vertex.label.tinted, 1.0);
    let galley = painter.layout_no_wrap(vertex.name.clone(), font, color);
    let size = galley.size();

    let outward = polar(vertex.angle, 1.0);
    let (reading, start) = if vertex.angle < 180.0 {
        (outward, outward * radius)
    } else {
        (-outward, outward * (radius + size.x))
    };
    let down = vec2(-reading.y, reading.x);
    let rotation = reading.y.atan2(reading.x);
    let origin = center + start - down * (size.y / 2.0);

    let passes = if vertex.label.bold { 2 } else { 1 };
    for pass in 0..passes {
        let nudge = reading * (pass as f32 * 0.5);
        painter.add(TextShape::new(origin + nudge, galley.clone(), color).with_angle(rotation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::scenario_model;
    use crate::views::bundle::BundleOptions;
    use crate::views::{Extent, ViewMount};

    #[test]
    fn hit_test_maps_ring_angles_to_vertices() {
        let model = scenario_model();
        let view = HierarchicalBundleView::new(
            &model,
            ViewMount::new("flare", Extent::Fixed(400.0)),
            BundleOptions::default(),
        );
        let ring = view.layout.text_radius + 2.0;

        assert_eq!(view.hit_test(polar(45.0, ring)), Some("A"));
        assert_eq!(view.hit_test(polar(200.0, ring)), Some("C"));
        assert_eq!(view.hit_test(polar(300.0, ring)), Some("D"));
        assert_eq!(view.hit_test(polar(45.0, 5.0)), None);
        assert_eq!(view.hit_test(polar(45.0, 260.0)), None);
    }
}
