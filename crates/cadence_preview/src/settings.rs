// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview settings

use anyhow::Context;
use cadence_animation::Beat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the timeline is sampled and logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Distance between samples
    #[serde(default = "default_step")]
    pub step: Beat,
    /// Emit the drawing snapshot with every sample
    #[serde(default)]
    pub include_drawing: bool,
    /// Extra `tracing` directives applied on top of `RUST_LOG`
    #[serde(default = "default_log_directives")]
    pub log_directives: Vec<String>,
    /// Override the document's duration
    #[serde(default)]
    pub time_length: Option<Beat>,
}

fn default_step() -> Beat {
    Beat::new(1, 4)
}

fn default_log_directives() -> Vec<String> {
    vec!["cadence_preview=info".to_string(), "cadence_animation=info".to_string()]
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            step: default_step(),
            include_drawing: false,
            log_directives: default_log_directives(),
            time_length: None,
        }
    }
}

impl PreviewSettings {
    /// Load settings from a RON file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let settings: PreviewSettings =
            ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        anyhow::ensure!(settings.step > Beat::ZERO, "sample step must be positive, got {}", settings.step);
        Ok(settings)
    }
}
