//! # deint-core
//!
//! Field-order aware temporal deinterlacing as a GPU filter stage.
//!
//! The stage keeps a private copy of the previous pre-filter frame and runs
//! one effect pass per frame that combines it with the current one. The
//! graphics API and pipeline position are abstracted by [`GraphicsHost`]
//! and [`FilterSource`]; `WgpuHost` is the bundled backend.

// ============================================================================
// Host abstraction
// ============================================================================
pub mod graphics;
pub mod resources;

// ============================================================================
// Filter
// ============================================================================
pub mod filter;
pub mod previous_frame;
pub mod registration;
pub mod settings;

// ============================================================================
// wgpu backend
// ============================================================================
#[cfg(feature = "wgpu-backend")]
pub mod effect;
#[cfg(feature = "wgpu-backend")]
pub mod headless;
#[cfg(feature = "wgpu-backend")]
pub mod wgpu_host;

#[cfg(test)]
mod testing;

pub use filter::{DeinterlaceFilter, FilterError, FilterState, RenderOutcome};
pub use graphics::{FilterSource, GraphicsError, GraphicsGuard, GraphicsHost};
pub use previous_frame::PreviousFrame;
pub use registration::{FilterInfo, DEINTERLACE_FILTER};
pub use resources::ModuleResources;
pub use settings::{DeinterlaceSettings, DeinterlaceStrategy};

#[cfg(feature = "wgpu-backend")]
pub use headless::HeadlessSource;
#[cfg(feature = "wgpu-backend")]
pub use wgpu_host::WgpuHost;
