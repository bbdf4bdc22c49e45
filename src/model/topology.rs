use std::collections::HashMap;

use eframe::egui::Color32;

use super::error::ModelError;
use super::frames::{FrameSelection, Presence};
use super::hierarchy::HierarchySpec;

pub const DEFAULT_TRACK_NAME: &str = "default";

#[derive(Clone, Debug)]
pub struct VertexSpec {
    pub name: String,
    pub track_size: f32,
    pub track_color: Color32,
}

#[derive(Clone, Debug)]
pub struct EdgeSpec {
    pub v1: String,
    pub v2: String,
    pub weight: f32,
    pub color: Color32,
    pub frames: Vec<bool>,
}

#[derive(Clone, Debug)]
pub struct TrackSpec {
    pub name: String,
    pub properties: Vec<(String, TrackProperty)>,
}

/// Immutable input snapshot handed to [`super::GraphModel::new`].
#[derive(Clone, Debug, Default)]
pub struct Topology {
    pub vertices: Vec<VertexSpec>,
    pub edges: Vec<EdgeSpec>,
    pub hierarchy: HierarchySpec,
    pub total_frames: usize,
    pub extra_tracks: Vec<TrackSpec>,
}

impl Topology {
    /// Checks everything the views rely on. Hierarchy leaves are checked
    /// when the hierarchy itself is built.
    pub fn validate(&self) -> Result<HashMap<String, usize>, ModelError> {
        let mut index_by_name = HashMap::with_capacity(self.vertices.len());
        for (index, vertex) in self.vertices.iter().enumerate() {
            if index_by_name.insert(vertex.name.clone(), index).is_some() {
                return Err(ModelError::DuplicateVertex(vertex.name.clone()));
            }
            check_track_size(&vertex.name, vertex.track_size)?;
        }

        for (index, edge) in self.edges.iter().enumerate() {
            for name in [&edge.v1, &edge.v2] {
                if !index_by_name.contains_key(name) {
                    return Err(ModelError::UnknownVertexReference {
                        referrer: format!("edge {index}"),
                        name: name.clone(),
                    });
                }
            }

            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(ModelError::InvalidWeight {
                    edge: index,
                    weight: edge.weight,
                });
            }

            if self.total_frames > 0 && edge.frames.len() != self.total_frames {
                return Err(ModelError::FrameLengthMismatch {
                    edge: index,
                    expected: self.total_frames,
                    actual: edge.frames.len(),
                });
            }
        }

        for track in &self.extra_tracks {
            for (name, property) in &track.properties {
                if !index_by_name.contains_key(name) {
                    return Err(ModelError::UnknownVertexReference {
                        referrer: format!("track `{}`", track.name),
                        name: name.clone(),
                    });
                }
                check_track_size(name, property.size)?;
            }
        }

        Ok(index_by_name)
    }
}

fn check_track_size(name: &str, size: f32) -> Result<(), ModelError> {
    if (0.0..=1.0).contains(&size) {
        Ok(())
    } else {
        Err(ModelError::InvalidTrackSize {
            name: name.to_owned(),
            size,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub name: String,
    /// Indices into [`super::GraphModel::edges`].
    pub edges: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub v1: usize,
    pub v2: usize,
    pub weight: f32,
    pub color: Color32,
    pub(super) presence: Presence,
}

impl Edge {
    pub(super) fn count(&self, selection: FrameSelection) -> u32 {
        self.presence.count(selection)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackProperty {
    pub size: f32,
    pub color: Color32,
}

impl Default for TrackProperty {
    fn default() -> Self {
        Self {
            size: 0.0,
            color: Color32::GRAY,
        }
    }
}

/// Track properties indexed like [`super::GraphModel::vertices`].
#[derive(Clone, Debug)]
pub struct Track {
    pub name: String,
    properties: Vec<TrackProperty>,
}

impl Track {
    pub(super) fn new(name: String, properties: Vec<TrackProperty>) -> Self {
        Self { name, properties }
    }

    pub fn get(&self, vertex: usize) -> TrackProperty {
        self.properties.get(vertex).copied().unwrap_or_default()
    }
}
