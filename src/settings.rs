//! Settings & Configuration
//!
//! Plain configuration structs for the three stages of the pipeline:
//!
//! - [`RigSettings`]: stylization of the procedurally built humanoid
//! - [`ExportSettings`]: output format and logical path of the baked asset
//! - [`RuntimeSettings`]: attachment retry cadence and stance cross-fading
//!
//! Every struct implements [`Default`] and deserializes with
//! `#[serde(default)]`, so a host may supply a partial JSON document.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mannequin::settings::{MannequinSettings, RigSettings, Stylization};
//!
//! // Defaults: chibi proportions, GLB output, 0.1 s retry, 0.3 s cross-fade
//! let settings = MannequinSettings::default();
//!
//! // Bigger head, shorter legs
//! let rig = RigSettings {
//!     stylization: Stylization {
//!         head_scale: 2.2,
//!         leg_length_scale: 0.8,
//!         ..Default::default()
//!     },
//! };
//!
//! // From a host-provided JSON document
//! let settings = MannequinSettings::from_json_str(r#"{ "runtime": { "retry_interval": 0.5 } }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// Rig
// ---------------------------------------------------------------------------

/// Proportion multipliers biasing the rig toward a stylized look.
///
/// The total standing height is fixed by `body_height`; the multipliers only
/// redistribute it. A larger head therefore shrinks everything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stylization {
    /// Total standing height in meters (feet to top of head).
    pub body_height: f32,
    /// Head size multiplier relative to realistic proportions.
    pub head_scale: f32,
    /// Upper arm + forearm length multiplier.
    pub arm_length_scale: f32,
    /// Upper leg + lower leg length multiplier.
    pub leg_length_scale: f32,
}

impl Default for Stylization {
    fn default() -> Self {
        Self {
            body_height: 1.2,
            head_scale: 1.8,
            arm_length_scale: 0.9,
            leg_length_scale: 0.85,
        }
    }
}

/// Settings for [`AvatarRig::build`](crate::rig::AvatarRig::build).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSettings {
    pub stylization: Stylization,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Serialization variant produced by the glTF writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetFormat {
    /// Binary glTF container (`.glb`). The only variant the exporter accepts.
    #[default]
    Glb,
    /// Text glTF with the buffer embedded as a base64 data URI (`.gltf`).
    Gltf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: AssetFormat,
    /// Fixed logical path consumers use to locate the asset.
    pub asset_path: String,
    /// Written to `asset.generator`.
    pub generator: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: AssetFormat::Glb,
            asset_path: "models/avatar.glb".to_string(),
            generator: concat!("mannequin ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Delay in seconds between attachment attempts while the avatar loads.
    pub retry_interval: f32,
    /// Fade window in seconds used by stance transitions (both directions).
    pub crossfade_duration: f32,
    /// Stance played as soon as an avatar's clips become available.
    pub initial_stance: Option<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            retry_interval: 0.1,
            crossfade_duration: 0.3,
            initial_stance: Some("Idle".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MannequinSettings {
    pub rig: RigSettings,
    pub export: ExportSettings,
    pub runtime: RuntimeSettings,
}

impl MannequinSettings {
    /// Parses settings from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            MannequinSettings::from_json_str(r#"{ "runtime": { "retry_interval": 0.5 } }"#)
                .unwrap();
        assert!((settings.runtime.retry_interval - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.runtime.initial_stance.as_deref(), Some("Idle"));
        assert_eq!(settings.export.format, AssetFormat::Glb);
        assert_eq!(settings.rig, RigSettings::default());
    }

    #[test]
    fn format_uses_snake_case() {
        let settings =
            MannequinSettings::from_json_str(r#"{ "export": { "format": "gltf" } }"#).unwrap();
        assert_eq!(settings.export.format, AssetFormat::Gltf);
        assert_eq!(settings.export.asset_path, "models/avatar.glb");
    }
}
