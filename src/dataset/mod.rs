mod parse;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::Topology;

/// Reads and validates a dataset file.
pub fn load_dataset(path: &Path) -> Result<Topology> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let topology =
        parse_dataset(&raw).with_context(|| format!("invalid dataset {}", path.display()))?;

    info!(
        path = %path.display(),
        vertices = topology.vertices.len(),
        edges = topology.edges.len(),
        frames = topology.total_frames,
        "dataset loaded"
    );
    Ok(topology)
}

pub fn parse_dataset(raw: &str) -> Result<Topology> {
    let raw: parse::RawDataset = serde_json::from_str(raw).context("dataset is not valid JSON")?;
    let topology = parse::into_topology(raw)?;
    topology.validate().context("dataset failed validation")?;
    Ok(topology)
}
