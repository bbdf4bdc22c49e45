use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use tracing::debug;

use crate::views::{BundleOptions, ForceOptions};

/// Layout tuning for both views, read from the `--options` file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub bundle: BundleOptions,
    pub force: ForceOptions,
}

/// Command line values that take precedence over the options file.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overrides {
    pub inactive_edge_opacity: Option<f32>,
    pub bundle_tension: Option<f32>,
    pub seed: Option<u64>,
}

impl LayoutOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read layout options {}", path.display()))?;
        let options = Self::from_json(&raw)
            .with_context(|| format!("invalid layout options {}", path.display()))?;
        debug!(path = %path.display(), "layout options loaded");
        Ok(options)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(raw)?;
        options.check()?;
        Ok(options)
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(opacity) = overrides.inactive_edge_opacity {
            self.bundle.inactive_edge_opacity = opacity;
            self.force.inactive_edge_opacity = opacity;
        }
        if let Some(tension) = overrides.bundle_tension {
            self.bundle.bundle_tension = tension;
        }
        if let Some(seed) = overrides.seed {
            self.force.seed = seed;
        }
        self.check()?;
        Ok(self)
    }

    fn check(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        ensure!(
            unit.contains(&self.bundle.inactive_edge_opacity),
            "bundle.inactive_edge_opacity must lie in [0, 1]"
        );
        ensure!(
            unit.contains(&self.force.inactive_edge_opacity),
            "force.inactive_edge_opacity must lie in [0, 1]"
        );
        ensure!(
            unit.contains(&self.force.inactive_vertex_opacity),
            "force.inactive_vertex_opacity must lie in [0, 1]"
        );
        ensure!(unit.contains(&self.bundle.bundle_tension), "bundle.bundle_tension must lie in [0, 1]");
        ensure!(
            self.force.alpha_decay > 0.0 && self.force.alpha_decay < 1.0,
            "force.alpha_decay must lie in (0, 1)"
        );
        ensure!(
            unit.contains(&self.force.velocity_decay),
            "force.velocity_decay must lie in [0, 1]"
        );
        ensure!(self.force.ticks_per_second > 0.0, "force.ticks_per_second must be positive");
        Ok(())
    }
}
