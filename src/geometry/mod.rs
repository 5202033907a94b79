//! # Geometry Module
//!
//! Static volume hierarchy for UCN transport.
//!
//! ```text
//!   world (Box, black hole)
//!   └── guide wall (Tube, stainless steel)
//!       └── bore (Tube, vacuum)          ← particles propagate here
//!           └── detector (Box, detector)
//! ```
//!
//! - [`shape`]: primitive solids and their analytic boundary-time queries
//! - [`transform`]: rigid placements between local and master frames
//! - [`tree`]: arena of placed volumes, builder and point location

pub mod shape;
pub mod transform;
pub mod tree;

pub use shape::{BoundaryTime, BoxShape, Shape, TubeShape};
pub use transform::Transform;
pub use tree::{GeometryBuilder, GeometryNode, GeometryTree, NodeId};
