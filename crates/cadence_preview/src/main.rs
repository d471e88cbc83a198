// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cadence Preview - headless animation scrubber
//!
//! Loads a RON animation document, samples it across the timeline and prints
//! one JSON object per sample on stdout:
//!
//! ```text
//! cadence_preview <document.ron> [settings.ron]
//! ```
//!
//! Logs go to stderr and honour `RUST_LOG`.

mod sample;
mod settings;

use anyhow::Context;
use cadence_animation::AnimationDocument;
use settings::PreviewSettings;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str = "usage: cadence_preview <document.ron> [settings.ron]";

fn init_logging(settings: &PreviewSettings) -> anyhow::Result<()> {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in &settings.log_directives {
        env_filter = env_filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("invalid log directive {directive:?}"))?,
        );
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let document_path = args.next().context(USAGE)?;
    let settings = match args.next() {
        Some(path) => PreviewSettings::load(&path)?,
        None => PreviewSettings::default(),
    };

    init_logging(&settings)?;
    tracing::info!("Starting Cadence Preview v{}", env!("CARGO_PKG_VERSION"));

    let document = AnimationDocument::load(&document_path)
        .with_context(|| format!("loading {}", document_path.display()))?;
    let mut animation = document.into_animation()?;
    tracing::info!(
        keyframes = animation.keyframes().len(),
        time_length = %animation.time_length(),
        step = %settings.step,
        "Loaded animation"
    );

    let samples = sample::sample_animation(&mut animation, &settings);
    let mut out = std::io::BufWriter::new(std::io::stdout().lock());
    for sample in &samples {
        serde_json::to_writer(&mut out, sample)?;
        writeln!(out)?;
    }
    out.flush()?;

    tracing::debug!(samples = samples.len(), "Finished sampling");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        tracing::error!("Preview failed: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
