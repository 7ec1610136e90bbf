// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIMXML-Lite Model - Component graph and shared types for BIM XML imports
//!
//! This crate holds the identity-resolution substrate shared by the reader
//! and the mesh partitioner:
//!
//! - [`ComponentGraph`] - arena of components keyed by external string ID,
//!   parent/child links, attribute reverse index, material cache and
//!   breadth-first traversal
//! - [`ComponentKind`] - closed classification with a total string mapping
//! - [`MeshSegment`] - finished mesh buffer attached to components
//! - [`ImportError`] / [`Diagnostic`] - fatal versus absorbed problems
//! - [`BimImporter`] / [`DocumentSource`] - importer entry points
//!
//! # Example
//!
//! ```
//! use bimxml_model::{Attribute, ComponentGraph};
//!
//! let mut graph = ComponentGraph::new();
//! let wall = graph.resolve("17", Some("Wall"));
//! // Later references resolve to the same node
//! assert_eq!(graph.resolve("17", None), wall);
//!
//! graph.index_attribute(wall, Attribute::new("FireRating", "REI 60")).unwrap();
//! assert_eq!(graph.components_with_attribute("FireRating"), &[wall]);
//! ```

pub mod attribute;
pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod material;
pub mod scene;
pub mod traits;
pub mod types;

pub use attribute::*;
pub use diagnostic::*;
pub use error::*;
pub use graph::*;
pub use material::*;
pub use scene::*;
pub use traits::*;
pub use types::*;
