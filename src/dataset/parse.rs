use anyhow::{Context, Result, anyhow, bail};
use eframe::egui::Color32;
use serde::Deserialize;

use crate::model::{EdgeSpec, HierarchySpec, Topology, TrackProperty, TrackSpec, TreeSpec, VertexSpec};

const DEFAULT_VERTEX_COLOR: Color32 = Color32::from_rgb(70, 130, 180);
const DEFAULT_EDGE_COLOR: Color32 = Color32::from_gray(150);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawDataset {
    #[serde(default)]
    pub(super) total_frames: Option<usize>,
    pub(super) vertices: Vec<RawVertex>,
    #[serde(default)]
    pub(super) edges: Vec<RawEdge>,
    #[serde(default)]
    pub(super) hierarchy: Option<RawHierarchy>,
    #[serde(default)]
    pub(super) tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawVertex {
    pub(super) name: String,
    #[serde(default)]
    pub(super) track_size: f32,
    #[serde(default)]
    pub(super) track_color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawEdge {
    pub(super) v1: String,
    pub(super) v2: String,
    #[serde(default = "default_weight")]
    pub(super) weight: f32,
    #[serde(default)]
    pub(super) color: Option<String>,
    #[serde(default)]
    pub(super) frames: Option<RawFrames>,
}

fn default_weight() -> f32 {
    1.0
}

/// Presence either as one flag per frame or as the list of frames present.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawFrames {
    Flags(Vec<bool>),
    Indices(Vec<usize>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawHierarchy {
    Paths(Vec<String>),
    Tree(RawTree),
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTree {
    pub(super) name: String,
    #[serde(default)]
    pub(super) children: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTrack {
    pub(super) name: String,
    #[serde(default)]
    pub(super) properties: Vec<RawTrackProperty>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTrackProperty {
    pub(super) vertex: String,
    #[serde(default)]
    pub(super) size: f32,
    #[serde(default)]
    pub(super) color: Option<String>,
}

pub(super) fn parse_color(value: &str) -> Result<Color32> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_ascii() {
            bail!("color `{value}` has non-hex digits");
        }
        let digits = match hex.len() {
            3 => hex.chars().flat_map(|digit| [digit, digit]).collect::<String>(),
            6 => hex.to_owned(),
            _ => bail!("color `{value}` must be #rgb or #rrggbb"),
        };
        let channel = |offset: usize| {
            u8::from_str_radix(&digits[offset..offset + 2], 16)
                .with_context(|| format!("color `{value}` has non-hex digits"))
        };
        return Ok(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?));
    }

    let named = match value.to_ascii_lowercase().as_str() {
        "black" => Color32::BLACK,
        "white" => Color32::WHITE,
        "gray" | "grey" => Color32::GRAY,
        "lightgray" | "lightgrey" => Color32::LIGHT_GRAY,
        "red" => Color32::from_rgb(255, 0, 0),
        "green" => Color32::from_rgb(0, 128, 0),
        "blue" => Color32::from_rgb(0, 0, 255),
        "yellow" => Color32::from_rgb(255, 255, 0),
        "orange" => Color32::from_rgb(255, 165, 0),
        "purple" => Color32::from_rgb(128, 0, 128),
        "steelblue" => DEFAULT_VERTEX_COLOR,
        _ => return Err(anyhow!("unknown color `{value}`")),
    };
    Ok(named)
}

fn color_or(value: Option<&str>, fallback: Color32) -> Result<Color32> {
    value.map_or(Ok(fallback), parse_color)
}

/// Frame count declared by the dataset, or the longest presence data when it
/// is omitted. Zero means the dataset has no temporal dimension.
fn infer_total_frames(raw: &RawDataset) -> usize {
    if let Some(total) = raw.total_frames {
        return total;
    }

    raw.edges
        .iter()
        .filter_map(|edge| match edge.frames.as_ref()? {
            RawFrames::Flags(flags) => Some(flags.len()),
            RawFrames::Indices(indices) => indices.iter().max().map(|last| last + 1),
        })
        .max()
        .unwrap_or(0)
}

fn presence(frames: Option<&RawFrames>, total_frames: usize, edge: usize) -> Result<Vec<bool>> {
    match frames {
        None => Ok(vec![true; total_frames]),
        // `[]` reads as flags but means no frame at all.
        Some(RawFrames::Flags(flags)) if flags.is_empty() => Ok(vec![false; total_frames]),
        Some(RawFrames::Flags(flags)) => Ok(flags.clone()),
        Some(RawFrames::Indices(indices)) => {
            let mut flags = vec![false; total_frames];
            for &frame in indices {
                let Some(slot) = flags.get_mut(frame) else {
                    bail!("edge {edge} lists frame {frame} but the dataset has {total_frames} frames");
                };
                *slot = true;
            }
            Ok(flags)
        }
    }
}

fn tree_spec(raw: RawTree) -> TreeSpec {
    TreeSpec {
        name: raw.name,
        children: raw.children.into_iter().map(tree_spec).collect(),
    }
}

pub(super) fn into_topology(raw: RawDataset) -> Result<Topology> {
    let total_frames = infer_total_frames(&raw);

    let vertices = raw
        .vertices
        .iter()
        .map(|vertex| {
            Ok(VertexSpec {
                name: vertex.name.clone(),
                track_size: vertex.track_size,
                track_color: color_or(vertex.track_color.as_deref(), DEFAULT_VERTEX_COLOR)
                    .with_context(|| format!("vertex `{}`", vertex.name))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let edges = raw
        .edges
        .iter()
        .enumerate()
        .map(|(index, edge)| {
            Ok(EdgeSpec {
                v1: edge.v1.clone(),
                v2: edge.v2.clone(),
                weight: edge.weight,
                color: color_or(edge.color.as_deref(), DEFAULT_EDGE_COLOR)
                    .with_context(|| format!("edge {index}"))?,
                frames: presence(edge.frames.as_ref(), total_frames, index)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let hierarchy = match raw.hierarchy {
        None => HierarchySpec::Implicit,
        Some(RawHierarchy::Paths(paths)) => HierarchySpec::Paths(paths),
        Some(RawHierarchy::Tree(tree)) => HierarchySpec::Tree(tree_spec(tree)),
    };

    let extra_tracks = raw
        .tracks
        .into_iter()
        .map(|track| {
            let properties = track
                .properties
                .into_iter()
                .map(|property| {
                    let color = color_or(property.color.as_deref(), DEFAULT_VERTEX_COLOR)
                        .with_context(|| format!("track `{}`", track.name))?;
                    Ok((
                        property.vertex,
                        TrackProperty {
                            size: property.size,
                            color,
                        },
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TrackSpec {
                name: track.name,
                properties,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Topology {
        vertices,
        edges,
        hierarchy,
        total_frames,
        extra_tracks,
    })
}
