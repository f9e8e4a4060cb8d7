//! Interlaced test material.
//!
//! Each frame is two fields captured half a frame apart: even rows at time
//! `n`, odd rows at `n + 0.5`. Motion between the fields shows up as combing.

use anyhow::{Context, Result};
use std::path::Path;

const BACKGROUND: [u8; 4] = [24, 24, 32, 255];
const BAR: [u8; 4] = [235, 235, 235, 255];

pub struct InterlacedFrames {
    width: u32,
    height: u32,
    base: Option<Vec<u8>>,
    /// Horizontal motion per field, in pixels.
    step: u32,
}

impl InterlacedFrames {
    pub fn synthetic(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            base: None,
            step: (width / 64).max(1),
        }
    }

    /// Pan a still image horizontally.
    pub fn from_image(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            base: Some(image.into_raw()),
            step: (width / 128).max(1),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame(&self, index: u32) -> Vec<u8> {
        let width = self.width as usize;
        let mut pixels = vec![0u8; width * self.height as usize * 4];

        for (y, row) in pixels.chunks_exact_mut(width * 4).enumerate() {
            let field = u64::from(index) * 2 + (y as u64 & 1);
            let shift = (field * u64::from(self.step) % u64::from(self.width)) as usize;

            match &self.base {
                Some(base) => {
                    let src = &base[y * width * 4..(y + 1) * width * 4];
                    for x in 0..width {
                        let from = (x + width - shift) % width;
                        row[x * 4..x * 4 + 4].copy_from_slice(&src[from * 4..from * 4 + 4]);
                    }
                }
                None => {
                    let bar_width = (width / 8).max(1);
                    for (x, px) in row.chunks_exact_mut(4).enumerate() {
                        let inside = (x + width - shift) % width < bar_width;
                        px.copy_from_slice(if inside { &BAR } else { &BACKGROUND });
                    }
                }
            }
        }

        pixels
    }
}
