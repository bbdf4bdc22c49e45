mod error;
mod events;
mod frames;
mod hierarchy;
mod topology;

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

pub use error::ModelError;
pub use events::{EventKind, ListenerFailure, ModelEvent, ModelListener, SharedListener};
pub use frames::FrameSelection;
pub use hierarchy::{Hierarchy, HierarchySpec, TreeSpec};
pub use topology::{
    DEFAULT_TRACK_NAME, Edge, EdgeSpec, Topology, Track, TrackProperty, TrackSpec, Vertex,
    VertexSpec,
};

use events::ListenerRegistry;
use frames::Presence;

/// Graph topology plus the mutable frame and selection state shared by every
/// mounted view. Only the setters here write that state; every write is
/// followed by a synchronous broadcast to the listeners of its category.
pub struct GraphModel {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    index_by_name: HashMap<String, usize>,
    hierarchy: Hierarchy,
    tracks: Vec<Track>,
    active_track: usize,
    total_frames: usize,
    frames: FrameSelection,
    highlighted: BTreeSet<String>,
    toggled: BTreeSet<String>,
    listeners: ListenerRegistry,
}

impl GraphModel {
    pub fn new(topology: Topology) -> Result<Self, ModelError> {
        let index_by_name = topology.validate()?;

        let Topology {
            vertices: vertex_specs,
            edges: edge_specs,
            hierarchy: hierarchy_spec,
            total_frames,
            extra_tracks,
        } = topology;

        let names = vertex_specs
            .iter()
            .map(|vertex| vertex.name.clone())
            .collect::<Vec<_>>();
        let hierarchy = Hierarchy::build(&hierarchy_spec, &names, &index_by_name)?;

        // Datasets without frame data behave as one static frame.
        let static_graph = total_frames == 0;
        let total_frames = total_frames.max(1);

        let mut vertices = names
            .into_iter()
            .map(|name| Vertex {
                name,
                edges: Vec::new(),
            })
            .collect::<Vec<_>>();

        let mut edges = Vec::with_capacity(edge_specs.len());
        for (index, spec) in edge_specs.into_iter().enumerate() {
            let (Some(&v1), Some(&v2)) = (index_by_name.get(&spec.v1), index_by_name.get(&spec.v2))
            else {
                return Err(ModelError::UnknownVertexReference {
                    referrer: format!("edge {index}"),
                    name: spec.v1,
                });
            };

            vertices[v1].edges.push(index);
            if v2 != v1 {
                vertices[v2].edges.push(index);
            }

            let flags = if static_graph { vec![true] } else { spec.frames };
            edges.push(Edge {
                v1,
                v2,
                weight: spec.weight,
                color: spec.color,
                presence: Presence::new(flags),
            });
        }

        let primary = Track::new(
            DEFAULT_TRACK_NAME.to_owned(),
            vertex_specs
                .iter()
                .map(|vertex| TrackProperty {
                    size: vertex.track_size,
                    color: vertex.track_color,
                })
                .collect(),
        );
        let mut tracks = vec![primary];
        for spec in extra_tracks {
            let mut properties = vec![TrackProperty::default(); vertices.len()];
            for (name, property) in spec.properties {
                if let Some(&vertex) = index_by_name.get(&name) {
                    properties[vertex] = property;
                }
            }
            tracks.push(Track::new(spec.name, properties));
        }

        info!(
            vertices = vertices.len(),
            edges = edges.len(),
            frames = total_frames,
            tracks = tracks.len(),
            "graph model constructed"
        );

        Ok(Self {
            vertices,
            edges,
            index_by_name,
            hierarchy,
            tracks,
            active_track: 0,
            total_frames,
            frames: FrameSelection::full(total_frames),
            highlighted: BTreeSet::new(),
            toggled: BTreeSet::new(),
            listeners: ListenerRegistry::default(),
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn track(&self) -> &Track {
        &self.tracks[self.active_track]
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn active_track(&self) -> usize {
        self.active_track
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn vertex(&self, name: &str) -> Option<&Vertex> {
        self.vertex_index(name).map(|index| &self.vertices[index])
    }

    pub fn vertex_index(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn vertex_name(&self, vertex: usize) -> &str {
        &self.vertices[vertex].name
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn frames(&self) -> FrameSelection {
        self.frames
    }

    pub fn set_frames(&mut self, selection: FrameSelection) -> Result<(), ModelError> {
        selection.validate(self.total_frames)?;
        self.frames = selection;
        debug!(%selection, "frame selection changed");
        self.notify(ModelEvent::FramesChange(selection));
        Ok(())
    }

    /// Number of frames in the current selection where `edge` is present.
    pub fn frame_count(&self, edge: &Edge) -> u32 {
        edge.count(self.frames)
    }

    /// Whether any incident edge of `vertex` is present in the current selection.
    pub fn vertex_active(&self, vertex: usize) -> bool {
        self.vertices[vertex]
            .edges
            .iter()
            .any(|&edge| self.frame_count(&self.edges[edge]) > 0)
    }

    pub fn set_vertex_highlighted(&mut self, name: &str, highlighted: bool) -> Result<(), ModelError> {
        self.require_vertex(name)?;
        if highlighted {
            self.highlighted.insert(name.to_owned());
        } else {
            self.highlighted.remove(name);
        }

        debug!(vertex = name, highlighted, "vertex highlight changed");
        self.notify(ModelEvent::VertexHighlight(self.highlighted_vertices()));
        Ok(())
    }

    pub fn vertex_highlighted(&self, name: &str) -> bool {
        self.highlighted.contains(name)
    }

    pub fn highlighted_vertices(&self) -> Vec<String> {
        self.highlighted.iter().cloned().collect()
    }

    pub fn set_vertex_toggled(&mut self, name: &str, toggled: bool) -> Result<(), ModelError> {
        self.require_vertex(name)?;
        if toggled {
            self.toggled.insert(name.to_owned());
        } else {
            self.toggled.remove(name);
        }

        debug!(vertex = name, toggled, "vertex toggle changed");
        self.notify(ModelEvent::VertexToggle(self.toggled_vertices()));
        Ok(())
    }

    pub fn vertex_toggled(&self, name: &str) -> bool {
        self.toggled.contains(name)
    }

    pub fn toggled_vertices(&self) -> Vec<String> {
        self.toggled.iter().cloned().collect()
    }

    pub fn set_track(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.tracks.len() {
            return Err(ModelError::UnknownTrack {
                index,
                count: self.tracks.len(),
            });
        }

        self.active_track = index;
        debug!(track = %self.tracks[index].name, "active track changed");
        self.notify(ModelEvent::VertexChange);
        Ok(())
    }

    pub fn add_vertex_change_listener(&mut self, listener: SharedListener) {
        self.listeners.add(EventKind::VertexChange, listener);
    }

    pub fn add_frame_listener(&mut self, listener: SharedListener) {
        self.listeners.add(EventKind::FramesChange, listener);
    }

    pub fn add_highlight_listener(&mut self, listener: SharedListener) {
        self.listeners.add(EventKind::VertexHighlight, listener);
    }

    pub fn add_toggle_listener(&mut self, listener: SharedListener) {
        self.listeners.add(EventKind::VertexToggle, listener);
    }

    /// Registers one listener for all four event categories.
    pub fn add_listener(&mut self, listener: SharedListener) {
        self.add_vertex_change_listener(listener.clone());
        self.add_frame_listener(listener.clone());
        self.add_highlight_listener(listener.clone());
        self.add_toggle_listener(listener);
    }

    fn require_vertex(&self, name: &str) -> Result<(), ModelError> {
        if self.index_by_name.contains_key(name) {
            Ok(())
        } else {
            Err(ModelError::UnknownVertex(name.to_owned()))
        }
    }

    fn notify(&self, event: ModelEvent) {
        let listeners = self.listeners.for_kind(event.kind());
        let failures = events::dispatch(listeners, &event, self);
        if failures > 0 {
            debug!(kind = ?event.kind(), failures, delivered = listeners.len() - failures, "event delivered with failures");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use eframe::egui::Color32;

    use super::*;

    pub(crate) fn vertex(name: &str, track_size: f32) -> VertexSpec {
        VertexSpec {
            name: name.to_owned(),
            track_size,
            track_color: Color32::LIGHT_BLUE,
        }
    }

    pub(crate) fn edge(v1: &str, v2: &str, weight: f32, present: &[usize], total: usize) -> EdgeSpec {
        let mut frames = vec![false; total];
        for &frame in present {
            frames[frame] = true;
        }
        EdgeSpec {
            v1: v1.to_owned(),
            v2: v2.to_owned(),
            weight,
            color: Color32::DARK_GRAY,
            frames,
        }
    }

    /// A–B present in frames {0, 1}, B–C in {2, 3, 4}, and an isolated D.
    pub(crate) fn scenario_topology() -> Topology {
        Topology {
            vertices: vec![
                vertex("A", 0.5),
                vertex("B", 1.0),
                vertex("C", 0.25),
                vertex("D", 0.0),
            ],
            edges: vec![
                edge("A", "B", 1.0, &[0, 1], 5),
                edge("B", "C", 2.0, &[2, 3, 4], 5),
            ],
            hierarchy: HierarchySpec::Implicit,
            total_frames: 5,
            extra_tracks: Vec::new(),
        }
    }

    pub(crate) fn scenario_model() -> GraphModel {
        GraphModel::new(scenario_topology()).expect("scenario topology is valid")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::test_support::*;
    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recording_listener(log: &Log, label: &'static str) -> SharedListener {
        let log = log.clone();
        Rc::new(RefCell::new(
            move |event: &ModelEvent, _: &GraphModel| -> Result<(), ListenerFailure> {
                log.borrow_mut().push(format!("{label}:{:?}", event.kind()));
                Ok(())
            },
        ))
    }

    #[test]
    fn frame_counts_follow_the_selection() {
        let mut model = scenario_model();
        let (ab, bc) = (model.edges()[0].clone(), model.edges()[1].clone());

        model
            .set_frames(FrameSelection::Range { begin: 0, end: 4 })
            .unwrap();
        assert_eq!(model.frame_count(&ab), 2);
        assert_eq!(model.frame_count(&bc), 3);

        model.set_frames(FrameSelection::Single { frame: 2 }).unwrap();
        assert_eq!(model.frame_count(&ab), 0);
        assert_eq!(model.frame_count(&bc), 1);
        assert!(!model.vertex_active(0));
        assert!(model.vertex_active(1));
    }

    #[test]
    fn invalid_selection_is_rejected_without_event() {
        let mut model = scenario_model();
        let log = Log::default();
        model.add_frame_listener(recording_listener(&log, "frames"));

        let reversed = model.set_frames(FrameSelection::Range { begin: 3, end: 1 });
        let outside = model.set_frames(FrameSelection::Single { frame: 5 });

        assert!(matches!(reversed, Err(ModelError::InvalidFrameSelection { .. })));
        assert!(matches!(outside, Err(ModelError::InvalidFrameSelection { .. })));
        assert_eq!(model.frames(), FrameSelection::full(5));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn toggle_round_trip() {
        let mut model = scenario_model();

        model.set_vertex_toggled("B", true).unwrap();
        assert!(model.vertex_toggled("B"));
        model.set_vertex_toggled("B", false).unwrap();
        assert!(!model.vertex_toggled("B"));
    }

    #[test]
    fn highlight_and_toggle_sets_are_independent() {
        let mut model = scenario_model();

        model.set_vertex_toggled("B", true).unwrap();
        model.set_vertex_highlighted("A", true).unwrap();

        assert!(!model.vertex_highlighted("B"));
        assert!(!model.vertex_toggled("A"));
        assert_eq!(model.highlighted_vertices(), vec!["A".to_owned()]);
        assert_eq!(model.toggled_vertices(), vec!["B".to_owned()]);
    }

    #[test]
    fn selection_events_carry_full_name_lists() {
        let mut model = scenario_model();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        model.add_toggle_listener(Rc::new(RefCell::new(
            move |event: &ModelEvent, _: &GraphModel| -> Result<(), ListenerFailure> {
                sink.borrow_mut().push(event.clone());
                Ok(())
            },
        )));

        model.set_vertex_toggled("C", true).unwrap();
        model.set_vertex_toggled("A", true).unwrap();

        assert_eq!(
            seen.borrow().last(),
            Some(&ModelEvent::VertexToggle(vec!["A".to_owned(), "C".to_owned()]))
        );
    }

    #[test]
    fn unknown_vertex_mutation_is_rejected() {
        let mut model = scenario_model();

        assert_eq!(
            model.set_vertex_toggled("Q", true),
            Err(ModelError::UnknownVertex("Q".to_owned()))
        );
        assert!(model.toggled_vertices().is_empty());
    }

    #[test]
    fn listeners_run_in_registration_order_per_category() {
        let mut model = scenario_model();
        let log = Log::default();
        model.add_highlight_listener(recording_listener(&log, "first"));
        model.add_frame_listener(recording_listener(&log, "frames-only"));
        model.add_highlight_listener(recording_listener(&log, "second"));

        model.set_vertex_highlighted("A", true).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "first:VertexHighlight".to_owned(),
                "second:VertexHighlight".to_owned()
            ]
        );
    }

    #[test]
    fn failing_listeners_do_not_block_delivery() {
        let mut model = scenario_model();
        let log = Log::default();

        model.add_frame_listener(Rc::new(RefCell::new(
            |_: &ModelEvent, _: &GraphModel| -> Result<(), ListenerFailure> {
                Err(ListenerFailure::Rejected("stale scene".to_owned()))
            },
        )));
        model.add_frame_listener(Rc::new(RefCell::new(
            |_: &ModelEvent, _: &GraphModel| -> Result<(), ListenerFailure> {
                panic!("renderer exploded")
            },
        )));
        model.add_frame_listener(recording_listener(&log, "survivor"));

        model.set_frames(FrameSelection::Single { frame: 1 }).unwrap();

        assert_eq!(*log.borrow(), vec!["survivor:FramesChange".to_owned()]);
        assert_eq!(model.frames(), FrameSelection::Single { frame: 1 });
        assert_eq!(model.frame_count(&model.edges()[0]), 1);
    }

    #[test]
    fn listeners_can_read_committed_state() {
        let mut model = scenario_model();
        let observed = Rc::new(RefCell::new(None));
        let sink = observed.clone();
        model.add_frame_listener(Rc::new(RefCell::new(
            move |_: &ModelEvent, model: &GraphModel| -> Result<(), ListenerFailure> {
                *sink.borrow_mut() = Some(model.frame_count(&model.edges()[1]));
                Ok(())
            },
        )));

        model.set_frames(FrameSelection::Range { begin: 3, end: 4 }).unwrap();

        assert_eq!(*observed.borrow(), Some(2));
    }

    #[test]
    fn construction_rejects_unknown_endpoint() {
        let mut topology = scenario_topology();
        topology.edges.push(edge("A", "Q", 1.0, &[0], 5));

        assert_eq!(
            GraphModel::new(topology).err(),
            Some(ModelError::UnknownVertexReference {
                referrer: "edge 2".to_owned(),
                name: "Q".to_owned()
            })
        );
    }

    #[test]
    fn construction_rejects_duplicates_and_bad_frames() {
        let mut duplicated = scenario_topology();
        duplicated.vertices.push(vertex("A", 0.1));
        assert_eq!(
            GraphModel::new(duplicated).err(),
            Some(ModelError::DuplicateVertex("A".to_owned()))
        );

        let mut short = scenario_topology();
        short.edges[1].frames.pop();
        assert!(matches!(
            GraphModel::new(short).err(),
            Some(ModelError::FrameLengthMismatch { edge: 1, .. })
        ));

        let mut oversized = scenario_topology();
        oversized.vertices[0].track_size = 1.5;
        assert!(matches!(
            GraphModel::new(oversized).err(),
            Some(ModelError::InvalidTrackSize { .. })
        ));
    }

    #[test]
    fn frameless_dataset_is_one_static_frame() {
        let mut topology = scenario_topology();
        topology.total_frames = 0;
        for edge in &mut topology.edges {
            edge.frames.clear();
        }
        let model = GraphModel::new(topology).unwrap();

        assert_eq!(model.total_frames(), 1);
        assert!(model.edges().iter().all(|edge| model.frame_count(edge) == 1));
    }

    #[test]
    fn switching_tracks_fires_vertex_change() {
        let mut topology = scenario_topology();
        topology.extra_tracks.push(TrackSpec {
            name: "conservation".to_owned(),
            properties: vec![(
                "C".to_owned(),
                TrackProperty {
                    size: 0.9,
                    color: eframe::egui::Color32::RED,
                },
            )],
        });
        let mut model = GraphModel::new(topology).unwrap();
        let log = Log::default();
        model.add_vertex_change_listener(recording_listener(&log, "views"));

        model.set_track(1).unwrap();

        assert_eq!(model.track().name, "conservation");
        assert_eq!(model.track().get(2).size, 0.9);
        assert_eq!(model.track().get(0).size, 0.0);
        assert_eq!(*log.borrow(), vec!["views:VertexChange".to_owned()]);
        assert!(matches!(
            model.set_track(7),
            Err(ModelError::UnknownTrack { index: 7, count: 2 })
        ));
    }
}
