//! Filter settings, the strategy selector and the property sheet shown by
//! the host.

use serde::{Deserialize, Serialize};

pub const SETTING_DEINTERLACER: &str = "deinterlacer";
pub const SETTING_FIELD_ORDER: &str = "field_order";

/// Settings as delivered by the host. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeinterlaceSettings {
    pub deinterlacer: String,
    pub field_order: bool,
}

impl Default for DeinterlaceSettings {
    fn default() -> Self {
        Self {
            deinterlacer: DeinterlaceStrategy::default().name().to_string(),
            field_order: false,
        }
    }
}

impl DeinterlaceSettings {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            SETTING_DEINTERLACER: self.deinterlacer,
            SETTING_FIELD_ORDER: self.field_order,
        })
    }
}

/// How the previous frame is combined with the current one.
///
/// New variants get their own arm in the filter's parameter binding; the
/// previous-frame handoff does not depend on the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeinterlaceStrategy {
    /// Keep the selected field, blend the other with the previous frame.
    #[default]
    TemporalBlend,
}

impl DeinterlaceStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "test" | "temporal_blend" => Some(DeinterlaceStrategy::TemporalBlend),
            _ => None,
        }
    }

    /// Settings value that selects this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            DeinterlaceStrategy::TemporalBlend => "test",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeinterlaceStrategy::TemporalBlend => "Temporal Blend",
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Bool {
        name: &'static str,
        description: &'static str,
    },
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Property::Bool { name, .. } => name,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Property::Bool { description, .. } => description,
        }
    }
}

/// Ordered property sheet handed to the host UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    items: Vec<Property>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bool(&mut self, name: &'static str, description: &'static str) {
        self.items.push(Property::Bool { name, description });
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.items.iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
