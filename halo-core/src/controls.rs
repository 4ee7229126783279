//! Control schema and `ControlSet` synthesis
//!
//! The schema is the fixed, ordered list of user-visible controls a Halo
//! radar exposes. [`ControlSet::from_state`] walks it in order and emits an
//! item for every control whose current value is known, so hosts always see
//! controls in the same stable order.

use serde::{Deserialize, Serialize};

use crate::state::StateMap;

/// How a control's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Enum,
    Float,
    FloatWithAuto,
}

/// One control with its current value and presentation metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlItem {
    pub name: String,
    /// Current value as a string; `"auto"` for auto-capable controls in
    /// auto mode
    pub value: String,
    pub label: String,
    pub control_type: ControlType,
    pub min_value: f32,
    pub max_value: f32,
    /// Allowed values for `Enum` controls, empty otherwise
    pub enums: Vec<String>,
}

/// Ordered snapshot of all controls with known values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSet {
    pub items: Vec<ControlItem>,
}

/// Schema entry kind, with the wire-independent value constraints
#[derive(Debug, Clone, Copy)]
pub enum ControlKind {
    Enum { options: &'static [&'static str] },
    Float { min: f32, max: f32 },
    FloatWithAuto {
        mode_name: &'static str,
        min: f32,
        max: f32,
    },
}

/// One entry of the fixed control schema
#[derive(Debug, Clone, Copy)]
pub struct SchemaEntry {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ControlKind,
}

pub const STATUS_OPTIONS: &[&str] = &["standby", "transmit"];
pub const MODE_OPTIONS: &[&str] = &["custom", "harbor", "offshore", "weather", "bird"];
pub const SEA_STATE_OPTIONS: &[&str] = &["calm", "moderate", "rough"];
pub const LEVEL_OPTIONS: &[&str] = &["off", "low", "medium", "high"];
pub const SCAN_SPEED_OPTIONS: &[&str] = &["off", "medium", "high"];
pub const DOPPLER_MODE_OPTIONS: &[&str] = &["off", "normal", "approaching_only"];

/// The control schema, in presentation order.
pub const SCHEMA: &[SchemaEntry] = &[
    SchemaEntry {
        name: "status",
        label: "Status",
        kind: ControlKind::Enum { options: STATUS_OPTIONS },
    },
    SchemaEntry {
        name: "range",
        label: "Range",
        kind: ControlKind::Float { min: 25.0, max: 75000.0 },
    },
    SchemaEntry {
        name: "mode",
        label: "Mode",
        kind: ControlKind::Enum { options: MODE_OPTIONS },
    },
    SchemaEntry {
        name: "gain",
        label: "Gain",
        kind: ControlKind::FloatWithAuto {
            mode_name: "gain_mode",
            min: 0.0,
            max: 100.0,
        },
    },
    SchemaEntry {
        name: "sea_clutter",
        label: "Sea clutter",
        kind: ControlKind::FloatWithAuto {
            mode_name: "sea_clutter_mode",
            min: 0.0,
            max: 100.0,
        },
    },
    SchemaEntry {
        name: "auto_sea_clutter_nudge",
        label: "Auto sea clut adj",
        kind: ControlKind::Float { min: -50.0, max: 50.0 },
    },
    SchemaEntry {
        name: "sea_state",
        label: "Sea state",
        kind: ControlKind::Enum { options: SEA_STATE_OPTIONS },
    },
    SchemaEntry {
        name: "rain_clutter",
        label: "Rain clutter",
        kind: ControlKind::Float { min: 0.0, max: 100.0 },
    },
    SchemaEntry {
        name: "noise_rejection",
        label: "Noise rejection",
        kind: ControlKind::Enum { options: LEVEL_OPTIONS },
    },
    SchemaEntry {
        name: "target_expansion",
        label: "Target expansion",
        kind: ControlKind::Enum { options: LEVEL_OPTIONS },
    },
    SchemaEntry {
        name: "interference_rejection",
        label: "Interf. rej",
        kind: ControlKind::Enum { options: LEVEL_OPTIONS },
    },
    SchemaEntry {
        name: "target_separation",
        label: "Target separation",
        kind: ControlKind::Enum { options: LEVEL_OPTIONS },
    },
    SchemaEntry {
        name: "scan_speed",
        label: "Fast scan",
        kind: ControlKind::Enum { options: SCAN_SPEED_OPTIONS },
    },
    SchemaEntry {
        name: "doppler_mode",
        label: "VelocityTrack",
        kind: ControlKind::Enum { options: DOPPLER_MODE_OPTIONS },
    },
    SchemaEntry {
        name: "doppler_speed",
        label: "Speed threshold",
        kind: ControlKind::Float { min: 0.05, max: 15.95 },
    },
    SchemaEntry {
        name: "antenna_height",
        label: "Antenna height",
        kind: ControlKind::Float { min: 0.0, max: 30.175 },
    },
    SchemaEntry {
        name: "bearing_alignment",
        label: "Bearing alignment",
        kind: ControlKind::Float { min: 0.0, max: 360.0 },
    },
    SchemaEntry {
        name: "sidelobe_suppression",
        label: "Sidelobe sup.",
        kind: ControlKind::FloatWithAuto {
            mode_name: "sidelobe_suppression_mode",
            min: 0.0,
            max: 100.0,
        },
    },
    SchemaEntry {
        name: "lights",
        label: "Halo light",
        kind: ControlKind::Enum { options: LEVEL_OPTIONS },
    },
];

/// Look up a schema entry by control name.
pub fn schema_entry(name: &str) -> Option<&'static SchemaEntry> {
    SCHEMA.iter().find(|entry| entry.name == name)
}

/// Wire byte for a mode name. Byte 3 is unused by the vendor.
pub(crate) fn mode_wire_value(name: &str) -> Option<u8> {
    match name {
        "custom" => Some(0),
        "harbor" => Some(1),
        "offshore" => Some(2),
        "weather" => Some(4),
        "bird" => Some(5),
        _ => None,
    }
}

/// Mode name for a wire byte.
pub(crate) fn mode_from_wire(byte: u8) -> Option<&'static str> {
    match byte {
        0 => Some("custom"),
        1 => Some("harbor"),
        2 => Some("offshore"),
        4 => Some("weather"),
        5 => Some("bird"),
        _ => None,
    }
}

impl ControlSet {
    /// Build a snapshot from the last-reported values.
    ///
    /// Controls without a reported value are omitted, not defaulted. An
    /// auto-capable control reads `"auto"` while its mode is auto,
    /// otherwise its last manual magnitude.
    pub fn from_state(state: &StateMap) -> ControlSet {
        let mut items = Vec::new();
        for entry in SCHEMA {
            match entry.kind {
                ControlKind::Enum { options } => {
                    if let Some(value) = state.get(entry.name) {
                        items.push(ControlItem {
                            name: entry.name.to_string(),
                            value: value.to_string(),
                            label: entry.label.to_string(),
                            control_type: ControlType::Enum,
                            min_value: 0.0,
                            max_value: 0.0,
                            enums: options.iter().map(|s| s.to_string()).collect(),
                        });
                    }
                }
                ControlKind::Float { min, max } => {
                    if let Some(value) = state.get(entry.name) {
                        items.push(ControlItem {
                            name: entry.name.to_string(),
                            value: value.to_string(),
                            label: entry.label.to_string(),
                            control_type: ControlType::Float,
                            min_value: min,
                            max_value: max,
                            enums: Vec::new(),
                        });
                    }
                }
                ControlKind::FloatWithAuto { mode_name, min, max } => {
                    if let (Some(value), Some(mode)) = (state.get(entry.name), state.get(mode_name))
                    {
                        let value = if mode == "auto" { "auto" } else { value };
                        items.push(ControlItem {
                            name: entry.name.to_string(),
                            value: value.to_string(),
                            label: entry.label.to_string(),
                            control_type: ControlType::FloatWithAuto,
                            min_value: min,
                            max_value: max,
                            enums: Vec::new(),
                        });
                    }
                }
            }
        }
        ControlSet { items }
    }
}
