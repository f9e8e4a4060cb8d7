//! Registration record the host pipeline uses to discover the filter.

use std::sync::Arc;

use crate::filter::{DeinterlaceFilter, FilterError};
use crate::graphics::{FilterSource, GraphicsHost};
use crate::resources::ModuleResources;
use crate::settings::{DeinterlaceSettings, Properties};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Input,
    Filter,
    Transition,
}

/// Output capability bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputFlags(u32);

impl OutputFlags {
    pub const VIDEO: Self = Self(1 << 0);
    pub const AUDIO: Self = Self(1 << 1);
    pub const ASYNC: Self = Self(1 << 2);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for OutputFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

pub type CreateFn = fn(
    Arc<dyn GraphicsHost>,
    Arc<dyn FilterSource>,
    &DeinterlaceSettings,
) -> Result<DeinterlaceFilter, FilterError>;

#[derive(Clone, Copy)]
pub struct FilterInfo {
    pub id: &'static str,
    pub kind: SourceKind,
    pub output_flags: OutputFlags,
    /// Localization key for the display name.
    pub name_key: &'static str,
    pub create: CreateFn,
    pub get_properties: fn() -> Properties,
    pub get_defaults: fn() -> DeinterlaceSettings,
}

impl std::fmt::Debug for FilterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterInfo")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("output_flags", &self.output_flags)
            .field("name_key", &self.name_key)
            .finish_non_exhaustive()
    }
}

fn create_with_env_resources(
    host: Arc<dyn GraphicsHost>,
    source: Arc<dyn FilterSource>,
    settings: &DeinterlaceSettings,
) -> Result<DeinterlaceFilter, FilterError> {
    DeinterlaceFilter::create(host, source, &ModuleResources::from_env(), settings)
}

pub const DEINTERLACE_FILTER: FilterInfo = FilterInfo {
    id: "deinterlace_filter",
    kind: SourceKind::Filter,
    output_flags: OutputFlags::VIDEO,
    name_key: "Deinterlacing",
    create: create_with_env_resources,
    get_properties: DeinterlaceFilter::properties,
    get_defaults: DeinterlaceFilter::defaults,
};
