//! # Error Types
//!
//! Recoverable failures, grouped by the layer that raises them.
//!
//! Internal inconsistencies of the root finders are not represented here:
//! they indicate a defect and panic at the point of detection.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single shape's boundary-time query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    /// A convex shape must always be exited; no root survived selection
    #[error("no boundary intersection found from inside {shape}")]
    NoIntersectionFound { shape: &'static str },

    /// Several roots on one surface lie too close to zero to tell apart
    #[error("{count} roots near zero on {shape} surface '{surface}'")]
    AmbiguousRoots {
        shape: &'static str,
        surface: &'static str,
        count: usize,
    },
}

/// Failures of a navigation step; fatal for the particle only
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("in volume '{node}': {source}")]
    Shape {
        node: String,
        #[source]
        source: ShapeError,
    },

    #[error("could not relocate into volume '{node}' after {steps} micro-steps")]
    RelocationExhausted { node: String, steps: usize },

    #[error("position {position} is not inside any tracking volume")]
    InvalidStart { position: String },

    #[error("no progress in volume '{node}' after {steps} consecutive steps")]
    Stuck { node: String, steps: usize },
}

/// Geometry construction and validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("geometry has no world volume")]
    NoWorld,

    #[error("world volume is already defined")]
    WorldAlreadySet,

    #[error("unknown mother volume id {0}")]
    UnknownNode(usize),

    #[error("invalid shape for volume '{name}': {reason}")]
    InvalidShape { name: String, reason: String },

    #[error("invalid material for volume '{name}': {reason}")]
    InvalidMaterial { name: String, reason: String },

    #[error("volumes '{first}' and '{second}' overlap")]
    Overlap { first: String, second: String },

    #[error("volume '{daughter}' extrudes from its mother '{mother}'")]
    Extrusion { daughter: String, mother: String },
}

/// Run configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = NavigationError::Shape {
            node: "inner".into(),
            source: ShapeError::NoIntersectionFound { shape: "tube" },
        };
        assert_eq!(
            e.to_string(),
            "in volume 'inner': no boundary intersection found from inside tube"
        );

        let g = GeometryError::Overlap {
            first: "a".into(),
            second: "b".into(),
        };
        assert!(g.to_string().contains("overlap"));
    }
}
