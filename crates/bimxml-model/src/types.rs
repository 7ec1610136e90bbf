// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for BIM XML data representation

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a component inside a [`ComponentGraph`](crate::ComponentGraph)
///
/// Handles are arena indices; they stay valid until the graph is reset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Handle to a shared material
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Component classification
///
/// Closed set of component types found in BIM XML exports. Values that cannot
/// be mapped end up as [`ComponentKind::Uncategorized`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Wall,
    Slab,
    Roof,
    Door,
    Window,
    Opening,
    Column,
    Beam,
    Stair,
    Railing,
    Covering,
    Space,
    Foundation,
    Surface,
    Furniture,
    /// Pure grouping node (root, storey, nested container)
    Container,
    /// Generic part or attribute-only object
    Other,
    #[default]
    Uncategorized,
}

/// Synonyms used by authoring tools, keyed by normalized name
const KIND_SYNONYMS: &[(&str, ComponentKind)] = &[
    ("multilayerwall", ComponentKind::Wall),
    ("curtainwall", ComponentKind::Wall),
    ("partition", ComponentKind::Wall),
    ("floor", ComponentKind::Slab),
    ("plate", ComponentKind::Slab),
    ("ceiling", ComponentKind::Covering),
    ("cladding", ComponentKind::Covering),
    ("skylight", ComponentKind::Window),
    ("hole", ComponentKind::Opening),
    ("void", ComponentKind::Opening),
    ("recess", ComponentKind::Opening),
    ("pillar", ComponentKind::Column),
    ("girder", ComponentKind::Beam),
    ("footing", ComponentKind::Foundation),
    ("pile", ComponentKind::Foundation),
    ("room", ComponentKind::Space),
    ("zone", ComponentKind::Space),
    ("storey", ComponentKind::Container),
    ("level", ComponentKind::Container),
    ("group", ComponentKind::Container),
    ("stairs", ComponentKind::Stair),
    ("ramp", ComponentKind::Stair),
    ("handrail", ComponentKind::Railing),
    ("furnishing", ComponentKind::Furniture),
    ("mesh", ComponentKind::Surface),
    ("genericpart", ComponentKind::Other),
    ("part", ComponentKind::Other),
    ("attribute", ComponentKind::Other),
];

impl ComponentKind {
    /// Every variant, in declaration order
    pub const ALL: [ComponentKind; 18] = [
        ComponentKind::Wall,
        ComponentKind::Slab,
        ComponentKind::Roof,
        ComponentKind::Door,
        ComponentKind::Window,
        ComponentKind::Opening,
        ComponentKind::Column,
        ComponentKind::Beam,
        ComponentKind::Stair,
        ComponentKind::Railing,
        ComponentKind::Covering,
        ComponentKind::Space,
        ComponentKind::Foundation,
        ComponentKind::Surface,
        ComponentKind::Furniture,
        ComponentKind::Container,
        ComponentKind::Other,
        ComponentKind::Uncategorized,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Wall => "wall",
            ComponentKind::Slab => "slab",
            ComponentKind::Roof => "roof",
            ComponentKind::Door => "door",
            ComponentKind::Window => "window",
            ComponentKind::Opening => "opening",
            ComponentKind::Column => "column",
            ComponentKind::Beam => "beam",
            ComponentKind::Stair => "stair",
            ComponentKind::Railing => "railing",
            ComponentKind::Covering => "covering",
            ComponentKind::Space => "space",
            ComponentKind::Foundation => "foundation",
            ComponentKind::Surface => "surface",
            ComponentKind::Furniture => "furniture",
            ComponentKind::Container => "container",
            ComponentKind::Other => "other",
            ComponentKind::Uncategorized => "uncategorized",
        }
    }

    /// Map a classification string from the file
    ///
    /// Exact (case- and separator-insensitive) name match first, then the
    /// synonym table. Returns `None` for anything else so the caller decides
    /// on the fallback.
    pub fn from_classification(value: &str) -> Option<Self> {
        let normalized = normalize(value);
        if normalized.is_empty() {
            return None;
        }

        if let Some(kind) = Self::ALL.iter().find(|k| k.name() == normalized) {
            return Some(*kind);
        }

        KIND_SYNONYMS
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, kind)| *kind)
    }

    /// Openings, doors and windows are excluded from solid treatment
    pub fn is_non_constructive(&self) -> bool {
        matches!(
            self,
            ComponentKind::Door | ComponentKind::Window | ComponentKind::Opening
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '\t'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Local pose of a component
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }
}

/// One finished, render-ready mesh buffer
///
/// Produced by the mesh partitioner. Every per-vertex array has the same
/// length; `indices` holds three entries per triangle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSegment {
    /// Segment name (component name plus segment ordinal)
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Tangent xyz plus bitangent sign in w
    pub tangents: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub use_light_probes: bool,
}

impl MeshSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check if segment is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// All per-vertex arrays have the same length
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.normals.len() == n && self.uvs.len() == n && self.tangents.len() == n
    }
}

/// Model metadata read from the document root and its metadata element
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// `projectID` of the root element
    pub project_id: String,
    /// `sourceFileName` of the root element
    pub source_file_name: Option<String>,
    /// Display name from the metadata element
    pub name: Option<String>,
    /// Description from the metadata element
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_classification() {
        assert_eq!(
            ComponentKind::from_classification("Wall"),
            Some(ComponentKind::Wall)
        );
        assert_eq!(
            ComponentKind::from_classification(" window "),
            Some(ComponentKind::Window)
        );
        assert_eq!(
            ComponentKind::from_classification("UNCATEGORIZED"),
            Some(ComponentKind::Uncategorized)
        );
    }

    #[test]
    fn test_synonym_classification() {
        assert_eq!(
            ComponentKind::from_classification("Multi-layer Wall"),
            Some(ComponentKind::Wall)
        );
        assert_eq!(
            ComponentKind::from_classification("generic_part"),
            Some(ComponentKind::Other)
        );
        assert_eq!(
            ComponentKind::from_classification("Skylight"),
            Some(ComponentKind::Window)
        );
    }

    #[test]
    fn test_unknown_classification() {
        assert_eq!(ComponentKind::from_classification("spaceship"), None);
        assert_eq!(ComponentKind::from_classification(""), None);
    }

    #[test]
    fn test_non_constructive_kinds() {
        let non: Vec<_> = ComponentKind::ALL
            .iter()
            .filter(|k| k.is_non_constructive())
            .collect();
        assert_eq!(
            non,
            vec![
                &ComponentKind::Door,
                &ComponentKind::Window,
                &ComponentKind::Opening
            ]
        );
    }

    #[test]
    fn test_mesh_segment_counts() {
        let mut segment = MeshSegment::new("slab_0");
        assert!(segment.is_empty());
        segment.positions = vec![[0.0; 3]; 3];
        segment.normals = vec![[0.0, 0.0, 1.0]; 3];
        segment.uvs = vec![[0.0; 2]; 3];
        segment.tangents = vec![[1.0, 0.0, 0.0, -1.0]; 3];
        segment.indices = vec![0, 1, 2];
        assert_eq!(segment.vertex_count(), 3);
        assert_eq!(segment.triangle_count(), 1);
        assert!(segment.is_consistent());
    }

    #[test]
    fn test_identity_transform() {
        let t = Transform::default();
        assert_eq!(t.rotation, UnitQuaternion::identity());
        assert_eq!(t.position, Vector3::zeros());
    }
}
