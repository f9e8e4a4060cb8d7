//! Render driver configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use deint_core::DeinterlaceSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub settings: DeinterlaceSettings,
    /// Still image to animate instead of the synthetic bar.
    pub input: Option<PathBuf>,
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frames: 8,
            width: 640,
            height: 360,
            settings: DeinterlaceSettings::default(),
            input: None,
            output: PathBuf::from("deinterlaced.png"),
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Config file (if given) plus `--frames` / `--output` overrides.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Self::default();
        let mut frames = None;
        let mut output = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--frames" => {
                    let value = args.get(i + 1).context("--frames needs a value")?;
                    frames = Some(value.parse().context("--frames must be a number")?);
                    i += 1;
                }
                "--output" => {
                    let value = args.get(i + 1).context("--output needs a path")?;
                    output = Some(PathBuf::from(value));
                    i += 1;
                }
                path => config = Self::load(Path::new(path))?,
            }
            i += 1;
        }

        if let Some(frames) = frames {
            config.frames = frames;
        }
        if let Some(output) = output {
            config.output = output;
        }
        anyhow::ensure!(config.frames > 0, "frame count must be positive");
        anyhow::ensure!(config.width > 0 && config.height > 0, "frame size must be non-zero");
        Ok(config)
    }
}
