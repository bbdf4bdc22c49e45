mod geometry;
mod paint;

use std::cell::RefCell;
use std::rc::Rc;

use eframe::egui::{Color32, Vec2};
use serde::Deserialize;
use tracing::{debug, info};

use crate::model::{GraphModel, ListenerFailure, ModelEvent, ModelListener};

use super::{HoverTracker, LabelStyle, ViewAction, ViewMount, edge_opacity, emphasized_names};
use geometry::RadialLayout;
use geometry::{ClusterPoint, basis_spline, bundle_points, cluster_layout, polar};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BundleOptions {
    pub bundle_tension: f32,
    pub inactive_edge_opacity: f32,
    pub track_width: f32,
    pub track_gap: f32,
    pub label_padding: f32,
    pub max_text_height: f32,
    pub spline_samples: usize,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            bundle_tension: 0.85,
            inactive_edge_opacity: 0.2,
            track_width: 12.0,
            track_gap: 4.0,
            label_padding: 4.0,
            max_text_height: 20.0,
            spline_samples: 6,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BundleVertex {
    pub vertex: usize,
    pub name: String,
    /// Degrees clockwise from twelve o'clock.
    pub angle: f32,
    pub label: LabelStyle,
}

#[derive(Clone, Debug)]
pub struct BundleEdge {
    pub edge: usize,
    pub v1: usize,
    pub v2: usize,
    /// Sampled spline relative to the view centre.
    pub path: Vec<Vec2>,
    pub color: Color32,
    pub stroke_width: f32,
    pub opacity: f32,
}

#[derive(Clone, Debug)]
pub struct TrackArc {
    pub vertex: usize,
    pub angle: f32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub color: Color32,
}

/// Radial flare of every vertex with hierarchically bundled edges. Holds a
/// retained scene that model events patch in place.
pub struct HierarchicalBundleView {
    mount: ViewMount,
    options: BundleOptions,
    layout: RadialLayout,
    vertices: Vec<BundleVertex>,
    edges: Vec<BundleEdge>,
    tracks: Vec<TrackArc>,
    hover: HoverTracker,
}

impl HierarchicalBundleView {
    pub fn new(model: &GraphModel, mount: ViewMount, options: BundleOptions) -> Self {
        let layout = RadialLayout::compute(mount.initial_width(), 0, 0, &options);
        let mut view = Self {
            mount,
            options,
            layout,
            vertices: Vec::new(),
            edges: Vec::new(),
            tracks: Vec::new(),
            hover: HoverTracker::default(),
        };
        view.rebuild(model);
        view
    }

    /// Builds the view and subscribes it to all four model event categories.
    pub fn mount(model: &mut GraphModel, mount: ViewMount, options: BundleOptions) -> Rc<RefCell<Self>> {
        info!(id = %mount.id, extent = %mount.extent, "mounting bundle view");
        let view = Rc::new(RefCell::new(Self::new(model, mount, options)));
        model.add_listener(view.clone());
        view
    }

    pub fn vertex(&self, name: &str) -> Option<&BundleVertex> {
        self.vertices.iter().find(|vertex| vertex.name == name)
    }

    pub fn edge(&self, edge: usize) -> Option<&BundleEdge> {
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

    pub(super) fn resize(&mut self, model: &GraphModel, width: f32) {
        if (self.layout.width - width).abs() < 0.5 {
            return;
        }
        debug!(id = %self.mount.id, width, "bundle view resized");
        self.layout.width = width;
        self.rebuild(model);
    }

    fn rebuild(&mut self, model: &GraphModel) {
        let longest_label = model
            .vertices()
            .iter()
            .map(|vertex| vertex.name.chars().count())
            .max()
            .unwrap_or(0);
        self.layout = RadialLayout::compute(
            self.layout.width,
            model.vertices().len(),
            longest_label,
            &self.options,
        );

        let points = cluster_layout(model.hierarchy(), self.layout.hierarchy_radius);
        self.update_vertices(model, &points);
        self.update_edges(model, &points);
        self.update_tracks(model);
        self.update_frames(model);
        self.update_highlight(model, &model.highlighted_vertices());
        self.update_toggle(model, &model.toggled_vertices());
    }

    fn update_vertices(&mut self, model: &GraphModel, points: &[ClusterPoint]) {
        let hierarchy = model.hierarchy();
        self.vertices = hierarchy
            .leaves()
            .iter()
            .filter_map(|&leaf| {
                let vertex = hierarchy.nodes()[leaf].vertex?;
                Some(BundleVertex {
                    vertex,
                    name: model.vertex_name(vertex).to_owned(),
                    angle: points[leaf].angle,
                    label: LabelStyle::default(),
                })
            })
            .collect();
    }

    fn update_edges(&mut self, model: &GraphModel, points: &[ClusterPoint]) {
        let hierarchy = model.hierarchy();
        self.edges = model
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| {
                let source = hierarchy.leaf_of(edge.v1)?;
                let target = hierarchy.leaf_of(edge.v2)?;
                let control = hierarchy
                    .path(source, target)
                    .into_iter()
                    .map(|node| polar(points[node].angle, points[node].radius))
                    .collect::<Vec<_>>();
                let bundled = bundle_points(&control, self.options.bundle_tension);

                Some(BundleEdge {
                    edge: index,
                    v1: edge.v1,
                    v2: edge.v2,
                    path: basis_spline(&bundled, self.options.spline_samples),
                    color: edge.color,
                    stroke_width: 0.0,
                    opacity: self.options.inactive_edge_opacity,
                })
            })
            .collect();
    }

    fn update_tracks(&mut self, model: &GraphModel) {
        let track = model.track();
        self.tracks = self
            .vertices
            .iter()
            .map(|vertex| {
                let property = track.get(vertex.vertex);
                let (inner_radius, outer_radius) = self.layout.track_radii(property.size);
                TrackArc {
                    vertex: vertex.vertex,
                    angle: vertex.angle,
                    inner_radius,
                    outer_radius,
                    color: property.color,
                }
            })
            .collect();
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
                count as f32 * edge.weight
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
            scene_edge.opacity = edge_opacity(model, scene_edge.v1, scene_edge.v2, inactive);
        }
    }
}

impl ModelListener for HierarchicalBundleView {
    fn fire(&mut self, event: &ModelEvent, model: &GraphModel) -> Result<(), ListenerFailure> {
        match event {
            ModelEvent::VertexChange => self.rebuild(model),
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
    use crate::model::{FrameSelection, HierarchySpec, TrackProperty, TrackSpec};
    use crate::views::Extent;

    fn mounted(model: &mut GraphModel) -> Rc<RefCell<HierarchicalBundleView>> {
        HierarchicalBundleView::mount(
            model,
            ViewMount::new("flare", Extent::Fixed(500.0)),
            BundleOptions::default(),
        )
    }

    #[test]
    fn every_vertex_is_a_leaf_even_without_edges() {
        let mut model = scenario_model();
        let view = mounted(&mut model);
        let view = view.borrow();

        let names = view.vertices.iter().map(|vertex| vertex.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["A", "B", "C", "D"]);
        assert_eq!(view.tracks.len(), 4);
        assert_eq!(view.edges.len(), 2);

        let angles = view.vertices.iter().map(|vertex| vertex.angle).collect::<Vec<_>>();
        assert_eq!(angles, [45.0, 135.0, 225.0, 315.0]);
    }

    #[test]
    fn stroke_width_scales_linearly_with_frame_count() {
        let mut model = scenario_model();
        let view = mounted(&mut model);

        model.set_frames(FrameSelection::Range { begin: 0, end: 4 }).unwrap();
        assert_eq!(view.borrow().edge(0).unwrap().stroke_width, 2.0);
        assert_eq!(view.borrow().edge(1).unwrap().stroke_width, 6.0);

        model.set_frames(FrameSelection::Single { frame: 2 }).unwrap();
        assert_eq!(view.borrow().edge(0).unwrap().stroke_width, 0.0);
        assert_eq!(view.borrow().edge(1).unwrap().stroke_width, 2.0);
    }

    #[test]
    fn toggling_either_endpoint_activates_the_edge() {
        let mut model = scenario_model();
        let view = mounted(&mut model);
        let inactive = BundleOptions::default().inactive_edge_opacity;

        assert_eq!(view.borrow().edge(0).unwrap().opacity, inactive);

        model.set_vertex_toggled("A", true).unwrap();
        assert_eq!(view.borrow().edge(0).unwrap().opacity, 1.0);
        assert_eq!(view.borrow().edge(1).unwrap().opacity, inactive);

        model.set_vertex_toggled("B", true).unwrap();
        assert_eq!(view.borrow().edge(1).unwrap().opacity, 1.0);

        model.set_vertex_toggled("A", false).unwrap();
        model.set_vertex_toggled("B", false).unwrap();
        assert_eq!(view.borrow().edge(0).unwrap().opacity, inactive);
        assert_eq!(view.borrow().edge(1).unwrap().opacity, inactive);
        assert!(view.borrow().vertex("B").is_some_and(|vertex| !vertex.label.bold));
    }

    #[test]
    fn highlight_styles_union_of_highlighted_and_toggled() {
        let mut model = scenario_model();
        let view = mounted(&mut model);
        let before = view.borrow().edges[1].path.clone();

        model.set_vertex_toggled("C", true).unwrap();
        model.set_vertex_highlighted("A", true).unwrap();

        let view = view.borrow();
        let style = |name: &str| view.vertex(name).unwrap().label;
        assert_eq!(style("A"), LabelStyle { bold: true, tinted: true });
        assert_eq!(style("C"), LabelStyle { bold: true, tinted: true });
        assert_eq!(style("B"), LabelStyle::default());
        assert_eq!(view.edges[1].path, before);
    }

    #[test]
    fn edges_bend_towards_the_common_ancestor() {
        let mut topology = scenario_topology();
        topology.hierarchy = HierarchySpec::Paths(vec![
            "left.A".to_owned(),
            "left.B".to_owned(),
            "right.C".to_owned(),
            "right.D".to_owned(),
        ]);
        let mut model = GraphModel::new(topology).unwrap();
        let view = mounted(&mut model);
        let view = view.borrow();
        let radius = view.layout.hierarchy_radius;

        let path = &view.edge(1).unwrap().path;
        let start = path[0];
        let end = *path.last().unwrap();
        assert!((start.length() - radius).abs() < 1e-3);
        assert!((end.length() - radius).abs() < 1e-3);

        let chord_mid = (start + end) / 2.0;
        let curve_mid = path[path.len() / 2];
        assert!(curve_mid.length() < chord_mid.length());
    }

    #[test]
    fn track_switch_rebuilds_arcs() {
        let mut topology = scenario_topology();
        topology.extra_tracks.push(TrackSpec {
            name: "alt".to_owned(),
            properties: vec![(
                "D".to_owned(),
                TrackProperty {
                    size: 1.0,
                    color: Color32::RED,
                },
            )],
        });
        let mut model = GraphModel::new(topology).unwrap();
        let view = mounted(&mut model);

        model.set_track(1).unwrap();

        let view = view.borrow();
        let layout = view.layout;
        let arc = view.tracks.iter().find(|arc| arc.vertex == 3).unwrap();
        assert_eq!(arc.color, Color32::RED);
        assert!((arc.inner_radius - layout.track_radius).abs() < 1e-4);
        assert!((arc.outer_radius - (layout.track_radius + layout.track_width)).abs() < 1e-4);
    }
}
