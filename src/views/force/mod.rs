mod forces;
mod paint;
mod quadtree;
mod simulation;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use eframe::egui::{Color32, Vec2, vec2};
use serde::Deserialize;
use tracing::{debug, info};

use crate::model::{GraphModel, ListenerFailure, ModelEvent, ModelListener};

use super::{HoverTracker, LabelStyle, ViewAction, ViewMount, edge_opacity, emphasized_names};
use simulation::{ForceSimulation, SimGraph, SimulationParams, TickClock};

const MIN_GLYPH_RADIUS: f32 = 2.0;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ForceOptions {
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub drag_alpha_target: f32,
    /// Minimum distance between two vertex centres.
    pub collision_distance: f32,
    pub collision_strength: f32,
    pub charge_strength: f32,
    pub theta: f32,
    pub link_distance: f32,
    pub radius_scale: f32,
    pub font_min: f32,
    pub font_scale: f32,
    pub edge_width_offset: f32,
    pub inactive_edge_opacity: f32,
    pub inactive_vertex_opacity: f32,
    pub seed: u64,
    pub ticks_per_second: f32,
    pub max_ticks_per_frame: usize,
}

impl Default for ForceOptions {
    fn default() -> Self {
        Self {
            alpha_decay: 0.0046,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            collision_distance: 18.0,
            collision_strength: 1.0,
            charge_strength: -80.0,
            theta: 0.9,
            link_distance: 30.0,
            radius_scale: 10.0,
            font_min: 8.0,
            font_scale: 6.0,
            edge_width_offset: 0.5,
            inactive_edge_opacity: 0.2,
            inactive_vertex_opacity: 0.2,
            seed: 0,
            ticks_per_second: 60.0,
            max_ticks_per_frame: 8,
        }
    }
}

impl ForceOptions {
    fn simulation_params(&self, center: Vec2) -> SimulationParams {
        SimulationParams {
            alpha_decay: self.alpha_decay,
            alpha_min: self.alpha_min,
            velocity_decay: self.velocity_decay,
            collision_radius: self.collision_distance / 2.0,
            collision_strength: self.collision_strength,
            charge_strength: self.charge_strength,
            theta: self.theta,
            distance_min: 1.0,
            link_distance: self.link_distance,
            center,
        }
    }

    fn tick_clock(&self) -> TickClock {
        TickClock {
            ticks_per_second: self.ticks_per_second,
            max_ticks_per_frame: self.max_ticks_per_frame,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForceVertex {
    pub vertex: usize,
    pub name: String,
    pub radius: f32,
    pub font_size: f32,
    pub color: Color32,
    pub opacity: f32,
    pub label: LabelStyle,
}

#[derive(Clone, Debug)]
pub struct ForceEdge {
    pub edge: usize,
    /// Simulation node indices, not model vertex indices.
    pub source: usize,
    pub target: usize,
    pub color: Color32,
    pub stroke_width: f32,
    pub opacity: f32,
}

/// Node-link layout of every vertex with at least one edge, driven by a
/// per-view force simulation.
pub struct ForceLayoutView {
    mount: ViewMount,
    options: ForceOptions,
    width: f32,
    simulation: ForceSimulation,
    vertices: Vec<ForceVertex>,
    node_by_vertex: HashMap<usize, usize>,
    edges: Vec<ForceEdge>,
    hover: HoverTracker,
    dragging: Option<usize>,
}

impl ForceLayoutView {
    pub fn new(model: &GraphModel, mount: ViewMount, options: ForceOptions) -> Self {
        let width = mount.initial_width();

        let included = model
            .vertices()
            .iter()
            .enumerate()
            .filter(|(_, vertex)| !vertex.edges.is_empty())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let node_by_vertex = included
            .iter()
            .enumerate()
            .map(|(node, &vertex)| (vertex, node))
            .collect::<HashMap<_, _>>();

        let vertices = included
            .iter()
            .map(|&vertex| ForceVertex {
                vertex,
                name: model.vertex_name(vertex).to_owned(),
                radius: MIN_GLYPH_RADIUS,
                font_size: options.font_min,
                color: Color32::GRAY,
                opacity: 1.0,
                label: LabelStyle::default(),
            })
            .collect::<Vec<_>>();

        let edges = model
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| {
                Some(ForceEdge {
                    edge: index,
                    source: *node_by_vertex.get(&edge.v1)?,
                    target: *node_by_vertex.get(&edge.v2)?,
                    color: edge.color,
                    stroke_width: 0.0,
                    opacity: options.inactive_edge_opacity,
                })
            })
            .collect::<Vec<_>>();

        let pairs = edges.iter().map(|edge| (edge.source, edge.target)).collect::<Vec<_>>();
        let simulation = ForceSimulation::new(
            SimGraph::new(vertices.len(), &pairs),
            options.simulation_params(vec2(width, width) / 2.0),
            options.tick_clock(),
            options.seed,
        );

        let mut view = Self {
            mount,
            options,
            width,
            simulation,
            vertices,
            node_by_vertex,
            edges,
            hover: HoverTracker::default(),
            dragging: None,
        };
        view.update_glyphs(model);
        view.update_frames(model);
        view.update_highlight(model, &model.highlighted_vertices());
        view.update_toggle(model, &model.toggled_vertices());
        view
    }

    /// Builds the view and subscribes it to all four model event categories.
    pub fn mount(model: &mut GraphModel, mount: ViewMount, options: ForceOptions) -> Rc<RefCell<Self>> {
        info!(id = %mount.id, extent = %mount.extent, seed = options.seed, "mounting force view");
        let view = Rc::new(RefCell::new(Self::new(model, mount, options)));
        model.add_listener(view.clone());
        view
    }

    pub fn vertex(&self, name: &str) -> Option<&ForceVertex> {
        self.vertices.iter().find(|vertex| vertex.name == name)
    }

    pub fn edge(&self, edge: usize) -> Option<&ForceEdge> {
        self.edges.iter().find(|candidate| candidate.edge == edge)
    }

    /// Highlight actions for the pointer now resting on `name`.
    pub fn set_hovered(&mut self, name: Option<&str>) -> Vec<ViewAction> {
        let mut actions = Vec::new();
        self.hover.update(name, &mut actions);
        actions
    }

    pub fn clear_hover(&mut self) -> Vec<ViewAction> {
        let mut actions = Vec::new();
        self.hover.clear(&mut actions);
        actions
    }

    /// Canvas position of a model vertex, `None` for vertices without edges.
    pub fn position(&self, vertex: usize) -> Option<Vec2> {
        let node = *self.node_by_vertex.get(&vertex)?;
        self.simulation.position(node)
    }

    pub fn simulation_mut(&mut self) -> &mut ForceSimulation {
        &mut self.simulation
    }

    fn resize(&mut self, width: f32) {
        if (self.width - width).abs() < 0.5 {
            return;
        }
        debug!(id = %self.mount.id, width, "force view resized");
        self.width = width;
        self.simulation.set_center(vec2(width, width) / 2.0);
    }

    fn update_glyphs(&mut self, model: &GraphModel) {
        let track = model.track();
        for vertex in &mut self.vertices {
            let property = track.get(vertex.vertex);
            vertex.radius = (self.options.radius_scale * property.size).max(MIN_GLYPH_RADIUS);
            vertex.font_size = self.options.font_min + property.size * self.options.font_scale;
            vertex.color = property.color;
        }
    }

    fn update_frames(&mut self, model: &GraphModel) {
        for scene_edge in &mut self.edges {
            let Some(edge) = model.edges().get(scene_edge.edge) else {
                continue;
            };
            let count = model.frame_count(edge);
            scene_edge.stroke_width = if count == 0 {
                0.0
            } else {
                (count as f32 * edge.weight).sqrt() + self.options.edge_width_offset
            };
        }

        for vertex in &mut self.vertices {
            vertex.opacity = if model.vertex_active(vertex.vertex) {
                1.0
            } else {
                self.options.inactive_vertex_opacity
            };
        }
    }

    fn update_highlight(&mut self, model: &GraphModel, highlighted: &[String]) {
        let emphasized = emphasized_names(model, highlighted);
        for vertex in &mut self.vertices {
            let emphasize = emphasized.contains(vertex.name.as_str());
            vertex.label.bold = emphasize;
            vertex.label.tinted = emphasize;
        }
    }

    fn update_toggle(&mut self, model: &GraphModel, toggled: &[String]) {
        for vertex in &mut self.vertices {
            vertex.label.bold = toggled.contains(&vertex.name);
        }

        let inactive = self.options.inactive_edge_opacity;
        for scene_edge in &mut self.edges {
            let (v1, v2) = (
                self.vertices[scene_edge.source].vertex,
                self.vertices[scene_edge.target].vertex,
            );
            scene_edge.opacity = edge_opacity(model, v1, v2, inactive);
        }
    }
}

impl ModelListener for ForceLayoutView {
    fn fire(&mut self, event: &ModelEvent, model: &GraphModel) -> Result<(), ListenerFailure> {
        match event {
            ModelEvent::VertexChange => self.update_glyphs(model),
            ModelEvent::FramesChange(_) => self.update_frames(model),
            ModelEvent::VertexHighlight(names) => self.update_highlight(model, names),
            ModelEvent::VertexToggle(names) => self.update_toggle(model, names),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{scenario_model, scenario_topology};
    use crate::model::{FrameSelection, TrackProperty, TrackSpec};
    use crate::views::{BundleOptions, Extent, HierarchicalBundleView};

    fn mounted(model: &mut GraphModel, seed: u64) -> Rc<RefCell<ForceLayoutView>> {
        ForceLayoutView::mount(
            model,
            ViewMount::new("force", Extent::Fixed(400.0)),
            ForceOptions {
                seed,
                ..ForceOptions::default()
            },
        )
    }

    #[test]
    fn vertices_without_edges_are_left_out() {
        let mut model = scenario_model();
        let view = mounted(&mut model, 0);
        let view = view.borrow();

        let names = view.vertices.iter().map(|vertex| vertex.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["A", "B", "C"]);
        assert!(view.position(3).is_none());
        assert_eq!(view.simulation.state().nodes.len(), 3);
    }

    #[test]
    fn stroke_width_and_vertex_opacity_follow_frames() {
        let mut model = scenario_model();
        let view = mounted(&mut model, 0);
        let offset = ForceOptions::default().edge_width_offset;

        model.set_frames(FrameSelection::Range { begin: 0, end: 4 }).unwrap();
        {
            let view = view.borrow();
            assert!((view.edge(0).unwrap().stroke_width - (2.0_f32.sqrt() + offset)).abs() < 1e-5);
            assert!((view.edge(1).unwrap().stroke_width - (6.0_f32.sqrt() + offset)).abs() < 1e-5);
            assert!(view.vertices.iter().all(|vertex| vertex.opacity == 1.0));
        }

        model.set_frames(FrameSelection::Single { frame: 2 }).unwrap();
        let view = view.borrow();
        assert_eq!(view.edge(0).unwrap().stroke_width, 0.0);
        assert!((view.edge(1).unwrap().stroke_width - (2.0_f32.sqrt() + offset)).abs() < 1e-5);
        assert_eq!(view.vertex("A").unwrap().opacity, 0.2);
        assert_eq!(view.vertex("B").unwrap().opacity, 1.0);
    }

    #[test]
    fn both_views_agree_on_toggle_opacity() {
        let mut model = scenario_model();
        let force = mounted(&mut model, 0);
        let bundle = HierarchicalBundleView::mount(
            &mut model,
            ViewMount::new("flare", Extent::FitWidth),
            BundleOptions::default(),
        );

        model.set_vertex_toggled("C", true).unwrap();
        assert_eq!(force.borrow().edge(1).unwrap().opacity, 1.0);
        assert_eq!(bundle.borrow().edge(1).unwrap().opacity, 1.0);
        assert_eq!(force.borrow().edge(0).unwrap().opacity, 0.2);
        assert_eq!(bundle.borrow().edge(0).unwrap().opacity, 0.2);

        model.set_frames(FrameSelection::Single { frame: 2 }).unwrap();
        assert_eq!(force.borrow().edge(0).unwrap().stroke_width, 0.0);
        assert_eq!(bundle.borrow().edge(0).unwrap().stroke_width, 0.0);

        model.set_vertex_toggled("C", false).unwrap();
        assert_eq!(force.borrow().edge(1).unwrap().opacity, 0.2);
        assert_eq!(bundle.borrow().edge(1).unwrap().opacity, 0.2);
    }

    #[test]
    fn equal_seeds_give_equal_positions_across_views() {
        let mut first_model = scenario_model();
        let mut second_model = scenario_model();
        let first = mounted(&mut first_model, 42);
        let second = mounted(&mut second_model, 42);

        for _ in 0..60 {
            first.borrow_mut().simulation_mut().tick();
            second.borrow_mut().simulation_mut().tick();
        }

        for vertex in 0..3 {
            assert_eq!(first.borrow().position(vertex), second.borrow().position(vertex));
        }
    }

    #[test]
    fn glyphs_resize_with_the_active_track() {
        let mut topology = scenario_topology();
        topology.extra_tracks.push(TrackSpec {
            name: "alt".to_owned(),
            properties: vec![(
                "A".to_owned(),
                TrackProperty {
                    size: 1.0,
                    color: Color32::GOLD,
                },
            )],
        });
        let mut model = GraphModel::new(topology).unwrap();
        let view = mounted(&mut model, 0);
        assert_eq!(view.borrow().vertex("A").unwrap().radius, 5.0);
        assert_eq!(view.borrow().vertex("A").unwrap().font_size, 11.0);

        model.set_track(1).unwrap();

        let view = view.borrow();
        assert_eq!(view.vertex("A").unwrap().radius, 10.0);
        assert_eq!(view.vertex("A").unwrap().color, Color32::GOLD);
        assert_eq!(view.vertex("B").unwrap().radius, MIN_GLYPH_RADIUS);
    }

    #[test]
    fn highlight_tints_without_touching_edges() {
        let mut model = scenario_model();
        let view = mounted(&mut model, 0);

        model.set_vertex_highlighted("B", true).unwrap();
        assert_eq!(view.borrow().vertex("B").unwrap().label, LabelStyle { bold: true, tinted: true });
        assert_eq!(view.borrow().edge(0).unwrap().opacity, 0.2);

        model.set_vertex_highlighted("B", false).unwrap();
        assert_eq!(view.borrow().vertex("B").unwrap().label, LabelStyle::default());
    }
}
