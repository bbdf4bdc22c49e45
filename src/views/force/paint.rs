use eframe::egui::{Align2, CursorIcon, FontId, Rect, Response, Sense, Stroke, Ui, Vec2, vec2};

use crate::model::GraphModel;

use super::super::ViewAction;
use super::super::render_utils::{draw_background, draw_label, label_color, local_pointer, with_opacity};
use super::ForceLayoutView;

const HIT_SLOP: f32 = 3.0;
const MAX_FRAME_SECONDS: f32 = 0.1;

impl ForceLayoutView {
    /// Advances the simulation by the frame time, paints it, and handles
    /// hover, click and drag.
    pub fn show(&mut self, ui: &mut Ui, _model: &GraphModel) -> Vec<ViewAction> {
        let width = self.mount.extent.resolve(ui.available_width());
        self.resize(width);

        let elapsed = ui.ctx().input(|input| input.stable_dt).min(MAX_FRAME_SECONDS);
        self.simulation.advance(elapsed);

        let (rect, response) = ui.allocate_exact_size(vec2(width, width), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);
        let origin = rect.min;

        for edge in &self.edges {
            if edge.stroke_width <= 0.0 || edge.source == edge.target {
                continue;
            }
            let (Some(from), Some(to)) = (
                self.simulation.position(edge.source),
                self.simulation.position(edge.target),
            ) else {
                continue;
            };
            painter.line_segment(
                [origin + from, origin + to],
                Stroke::new(edge.stroke_width, with_opacity(edge.color, edge.opacity)),
            );
        }

        for (node, vertex) in self.vertices.iter().enumerate() {
            let Some(position) = self.simulation.position(node) else {
                continue;
            };
            let center = origin + position;
            painter.circle_filled(center, vertex.radius, with_opacity(vertex.color, vertex.opacity));
            draw_label(
                &painter,
                center + vec2(vertex.radius + 3.0, 0.0),
                Align2::LEFT_CENTER,
                &vertex.name,
                FontId::proportional(vertex.font_size),
                label_color(vertex.label.tinted, vertex.opacity),
                vertex.label.bold,
            );
        }

        let actions = self.handle_pointer(ui, rect, &response);

        if self.simulation.is_running() || self.dragging.is_some() {
            ui.ctx().request_repaint();
        }
        actions
    }

    fn handle_pointer(&mut self, ui: &Ui, rect: Rect, response: &Response) -> Vec<ViewAction> {
        if response.drag_started() {
            let press = ui.input(|input| input.pointer.press_origin());
            if let Some(node) = local_pointer(rect, press).and_then(|local| self.hit_test(local)) {
                self.dragging = Some(node);
                self.simulation.drag_start(node, self.options.drag_alpha_target);
            }
        }

        if let Some(node) = self.dragging
            && response.dragged()
            && let Some(pointer) = response.interact_pointer_pos()
        {
            let local = (pointer - rect.min).clamp(Vec2::ZERO, rect.size());
            self.simulation.drag_move(node, local);
        }

        if response.drag_stopped() && self.dragging.take().is_some() {
            self.simulation.drag_end();
        }

        let hovered = self
            .dragging
            .or_else(|| local_pointer(rect, response.hover_pos()).and_then(|local| self.hit_test(local)));
        let hovered_name = hovered.map(|node| self.vertices[node].name.clone());

        if self.dragging.is_some() {
            ui.output_mut(|output| output.cursor_icon = CursorIcon::Grabbing);
        } else if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = CursorIcon::PointingHand);
        }

        let mut actions = self.set_hovered(hovered_name.as_deref());

        // Each click of a double click toggles, so the pair leaves the
        // selection as it was while the pin is dropped.
        if response.double_clicked()
            && let Some(node) = hovered
        {
            self.simulation.release(node);
        }
        if response.clicked()
            && let Some(name) = hovered_name
        {
            actions.push(ViewAction::Toggle { name });
        }
        actions
    }

    /// Simulation node under `local`, a canvas-relative point.
    pub fn hit_test(&self, local: Vec2) -> Option<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(node, vertex)| {
                let distance = (self.simulation.position(node)? - local).length();
                (distance <= vertex.radius + HIT_SLOP).then_some((node, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::scenario_model;
    use crate::views::force::ForceOptions;
    use crate::views::{Extent, ViewMount};

    #[test]
    fn hit_test_finds_the_nearest_glyph() {
        let model = scenario_model();
        let view = ForceLayoutView::new(
            &model,
            ViewMount::new("force", Extent::Fixed(300.0)),
            ForceOptions::default(),
        );

        let b = view.simulation.position(1).unwrap();
        assert_eq!(view.hit_test(b + vec2(1.0, 0.0)), Some(1));
        assert_eq!(view.hit_test(vec2(-500.0, -500.0)), None);
    }
}
