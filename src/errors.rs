//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`MannequinError`] covers the failure modes that are
//! allowed to reach a caller:
//! - Rig construction invariants (duplicate bones, dangling skin indices)
//! - Asset serialization and parsing errors
//! - The export contract violation ([`MannequinError::NotBinary`])
//! - Behavior registration and property parsing errors
//!
//! Unknown equipment identifiers, unknown attachment targets and missing bones
//! are *not* errors: they degrade to `None`, identity lists or log records.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, MannequinError>`.
//!
//! ```rust,ignore
//! use mannequin::errors::Result;
//! use mannequin::rig::AvatarRig;
//!
//! fn bake() -> Result<Vec<u8>> {
//!     let rig = AvatarRig::build(&Default::default())?;
//!     rig.export(&Default::default())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum MannequinError {
    // ========================================================================
    // Rig Construction Errors
    // ========================================================================
    /// A structural invariant of the rig was violated.
    #[error("Invalid rig: {0}")]
    InvalidRig(String),

    /// A skin binding or animation track references a bone that does not exist.
    #[error("Bone not found: '{bone}' (referenced by {referenced_by})")]
    MissingBone {
        /// The bone name that failed to resolve
        bone: String,
        /// What referenced it (track path, skin binding, ...)
        referenced_by: String,
    },

    // ========================================================================
    // Export Errors
    // ========================================================================
    /// The serializer produced something other than a binary buffer.
    ///
    /// This is a programming-contract violation (e.g. the exporter was
    /// configured for the text variant) and is never recoverable.
    #[error("Export contract violation: expected a binary asset, serializer produced {produced}")]
    NotBinary {
        /// Description of what the serializer actually produced
        produced: &'static str,
    },

    // ========================================================================
    // Asset Loading Errors
    // ========================================================================
    /// Asset index out of bounds.
    #[error("Asset index out of bounds: {context} (index: {index})")]
    AssetIndexOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
    },

    /// glTF parsing or framing error.
    #[error("glTF error: {0}")]
    GltfError(String),

    /// Data URI parsing error.
    #[error("Data URI error: {0}")]
    DataUriError(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    // ========================================================================
    // Runtime Behavior Errors
    // ========================================================================
    /// No behavior is registered under this name.
    #[error("Unknown behavior: {0}")]
    UnknownBehavior(String),

    /// An avatar or equipment key that is not (or no longer) in the world.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Behavior properties could not be parsed.
    #[error("Invalid properties for behavior '{behavior}': {reason}")]
    InvalidBehaviorProps {
        /// Behavior name
        behavior: String,
        /// Parser message
        reason: String,
    },
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<gltf::Error> for MannequinError {
    fn from(err: gltf::Error) -> Self {
        MannequinError::GltfError(err.to_string())
    }
}

/// Alias for `Result<T, MannequinError>`.
pub type Result<T> = std::result::Result<T, MannequinError>;
