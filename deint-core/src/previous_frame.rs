//! Single-owner slot for the previous frame's captured texture.

use crate::graphics::{Texture, TextureRef};

#[derive(Debug, Default)]
pub struct PreviousFrame {
    texture: Option<Texture>,
    generation: u64,
}

impl PreviousFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self) -> Option<TextureRef> {
        self.texture.as_ref().map(Texture::handle)
    }

    /// Number of captures installed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Install `next` and hand the displaced texture to `release`.
    ///
    /// The slot holds `next` before `release` runs, so a panicking release
    /// cannot leave it empty or pointing at a freed texture.
    pub fn swap_and_release(&mut self, next: Texture, release: impl FnOnce(Texture)) {
        let old = self.texture.replace(next);
        self.generation += 1;
        if let Some(old) = old {
            release(old);
        }
    }

    pub fn take(&mut self) -> Option<Texture> {
        self.texture.take()
    }
}
