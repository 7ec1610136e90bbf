// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIMXML-Lite Geometry
//!
//! Streaming mesh partitioning for BIM XML object geometry.
//!
//! ## Overview
//!
//! A component's geometry arrives as a flat point list followed by faces,
//! each face a soup of point-index triangles. This crate turns that into
//! render-ready [`MeshSegment`](bimxml_model::MeshSegment)s:
//!
//! - **Adjacency walk**: each face is traversed breadth-first over a
//!   point -> triangle map, starting from a seed point at UV (0, 0)
//! - **Planar UVs**: every triangle projects its corners onto its own
//!   plane, offset from the UV of the point it was reached from
//! - **Segment ceiling**: no segment exceeds 65,000 triangles; when one
//!   fills up the last two corners carry over into the next
//! - **Validation**: repeated or out-of-range indices never reach the
//!   adjacency map
//!
//! ## Quick Start
//!
//! ```rust
//! use bimxml_geometry::{MeshPartitioner, PartitionOptions, Point3};
//!
//! let mut partitioner =
//!     MeshPartitioner::start_meshing("slab", PartitionOptions::default(), Vec::new());
//! partitioner.append_point(Point3::new(0.0, 0.0, 0.0));
//! partitioner.append_point(Point3::new(1.0, 0.0, 0.0));
//! partitioner.append_point(Point3::new(0.0, 1.0, 0.0));
//! partitioner.start_face();
//! partitioner.append_triangle(0, 1, 2).unwrap();
//! partitioner.end_face();
//!
//! let segments = partitioner.end_meshing();
//! assert_eq!(segments.len(), 1);
//! assert_eq!(segments[0].triangle_count(), 1);
//! ```

pub mod basis;
pub mod error;
pub mod partitioner;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

// Re-export main types
pub use basis::{triangle_normal, PlanarBasis};
pub use error::{Error, Result};
pub use partitioner::{
    FnSink, MeshPartitioner, MeshSink, PartitionOptions, PartitionStats, FORMAT_TRIANGLE_CEILING,
};
