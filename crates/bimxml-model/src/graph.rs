// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Component graph and identity cache
//!
//! Components live in an arena and are addressed by [`ComponentId`]. The
//! external string ID of the file maps to exactly one arena slot; every
//! reference, whether it declares the component or merely points at it,
//! goes through [`ComponentGraph::resolve`].

use crate::{
    Attribute, ComponentId, ComponentKind, GraphError, Material, MaterialId, MeshSegment,
    Transform,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

/// One node of the imported model tree
#[derive(Clone, Debug)]
pub struct Component {
    /// External ID, unique within one import
    pub external_id: String,
    /// Creation order (informational)
    pub sequence: usize,
    /// Numeric interpretation of the external ID; `None` when it is not a number
    pub numeric_id: Option<u64>,
    /// Display name
    pub name: String,
    pub kind: ComponentKind,
    /// False for openings, doors, windows and everything below them
    pub is_constructive: bool,
    /// Pure grouping node (not renderable)
    ///
    /// Grouping nodes keep `is_constructive == true` so that the flag only
    /// ever turns false below an opening, door or window; containers hold
    /// constructive children. The flag carries no meaning of its own on a
    /// grouping node.
    pub is_grouping: bool,
    pub material: Option<MaterialId>,
    pub meshes: Vec<MeshSegment>,
    /// Attributes in the order they were indexed
    pub attributes: Vec<Attribute>,
    /// Initial pose, copied from the parent when linked
    pub transform: Transform,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
}

impl Component {
    fn new(external_id: &str, sequence: usize) -> Self {
        let numeric_id = external_id.trim().parse::<u64>().ok();
        if numeric_id.is_none() {
            log::trace!("component ID '{}' is not numeric", external_id);
        }

        Self {
            external_id: external_id.to_string(),
            sequence,
            numeric_id,
            name: String::new(),
            kind: ComponentKind::default(),
            is_constructive: true,
            is_grouping: false,
            material: None,
            meshes: Vec::new(),
            attributes: Vec::new(),
            transform: Transform::identity(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    /// Renderable nodes carry geometry and are not pure groups
    pub fn is_renderable(&self) -> bool {
        !self.is_grouping && !self.meshes.is_empty()
    }

    /// Get the first attribute with the given name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(MeshSegment::triangle_count).sum()
    }
}

/// Identity-keyed component arena plus attribute and material caches
#[derive(Clone, Debug, Default)]
pub struct ComponentGraph {
    nodes: Vec<Component>,
    by_external_id: FxHashMap<String, ComponentId>,
    /// Attribute name -> components carrying it (one entry per attribute)
    attribute_index: FxHashMap<String, Vec<ComponentId>>,
    materials: Vec<Material>,
    material_index: FxHashMap<String, MaterialId>,
    /// Base material name -> transparent clone
    transparent_variants: FxHashMap<String, MaterialId>,
    root: Option<ComponentId>,
}

impl ComponentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the component for `external_id`, creating it on first reference
    ///
    /// A display name fills in the component's name if it has none yet.
    pub fn resolve(&mut self, external_id: &str, display_name: Option<&str>) -> ComponentId {
        let id = match self.by_external_id.get(external_id) {
            Some(&id) => id,
            None => {
                let id = ComponentId(self.nodes.len() as u32);
                self.nodes.push(Component::new(external_id, id.index()));
                self.by_external_id.insert(external_id.to_string(), id);
                id
            }
        };

        if let Some(name) = display_name {
            let node = &mut self.nodes[id.index()];
            if node.name.is_empty() {
                node.name = name.to_string();
            }
        }

        id
    }

    /// Look up without creating
    pub fn lookup(&self, external_id: &str) -> Option<ComponentId> {
        self.by_external_id.get(external_id).copied()
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.nodes.get_mut(id.index())
    }

    /// Resolve-by-ID for collaborators: existing components only
    pub fn by_external_id(&self, external_id: &str) -> Option<&Component> {
        self.lookup(external_id).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<ComponentId> {
        self.root
    }

    pub fn set_root(&mut self, id: ComponentId) {
        self.root = Some(id);
    }

    /// Link `child` under `parent`, copying the parent's pose
    ///
    /// A component is parented at most once. Links that would make a
    /// component its own ancestor are refused.
    pub fn set_parent(&mut self, child: ComponentId, parent: ComponentId) -> Result<(), GraphError> {
        self.check(child)?;
        self.check(parent)?;

        if child == parent {
            return Err(GraphError::SelfParent(child));
        }
        if let Some(existing) = self.nodes[child.index()].parent {
            return Err(GraphError::AlreadyParented {
                child,
                parent: existing,
            });
        }
        if self.is_ancestor(child, parent) {
            return Err(GraphError::Cycle { child, parent });
        }

        let pose = self.nodes[parent.index()].transform;
        let node = &mut self.nodes[child.index()];
        node.transform = pose;
        node.parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Is `ancestor` on the parent chain of `id` (or `id` itself)
    pub fn is_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut current = Some(id);
        // Bounded by node count in case of a corrupted chain
        let mut steps = 0;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.nodes.get(node.index()).and_then(|n| n.parent);
        }
        false
    }

    /// Append an attribute and register the component under its name
    ///
    /// Repeated names accumulate; nothing is deduplicated.
    pub fn index_attribute(
        &mut self,
        id: ComponentId,
        attribute: Attribute,
    ) -> Result<(), GraphError> {
        self.check(id)?;
        self.attribute_index
            .entry(attribute.name.clone())
            .or_default()
            .push(id);
        self.nodes[id.index()].attributes.push(attribute);
        Ok(())
    }

    /// Components carrying the named attribute, once per attribute occurrence
    pub fn components_with_attribute(&self, name: &str) -> &[ComponentId] {
        self.attribute_index
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names present in the attribute reverse index
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attribute_index.keys().map(String::as_str)
    }

    /// Discard every component, index and material
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.by_external_id.clear();
        self.attribute_index.clear();
        self.materials.clear();
        self.material_index.clear();
        self.transparent_variants.clear();
        self.root = None;
    }

    // ------------------------------------------------------------------
    // Materials
    // ------------------------------------------------------------------

    /// Return the material slot for `external_id`, creating a placeholder
    /// on first reference
    pub fn material_slot(&mut self, external_id: &str) -> MaterialId {
        if let Some(&id) = self.material_index.get(external_id) {
            return id;
        }
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Material::placeholder(external_id));
        self.material_index.insert(external_id.to_string(), id);
        id
    }

    /// Store a material definition
    ///
    /// Fills a placeholder slot if one exists. Returns `None` when the ID
    /// already has a definition; the first definition wins.
    pub fn define_material(&mut self, material: Material) -> Option<MaterialId> {
        let id = self.material_slot(&material.external_id);
        let slot = &mut self.materials[id.index()];
        if slot.defined {
            return None;
        }
        *slot = Material {
            defined: true,
            ..material
        };
        Some(id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    pub fn material_by_external_id(&self, external_id: &str) -> Option<MaterialId> {
        self.material_index.get(external_id).copied()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Transparent clone of `base`, created at most once per base material name
    pub fn transparent_variant(&mut self, base: MaterialId, alpha: f32) -> Option<MaterialId> {
        let base_material = self.materials.get(base.index())?;
        if let Some(&id) = self.transparent_variants.get(&base_material.name) {
            return Some(id);
        }

        let variant = base_material.transparent_variant(alpha);
        let key = base_material.name.clone();
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(variant);
        self.transparent_variants.insert(key, id);
        Some(id)
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Breadth-first walk from `start`
    ///
    /// `visit` returns whether to descend into the node's children. Backed
    /// by an explicit queue, so depth is not limited by the call stack.
    pub fn visit_breadth_first<F>(&self, start: ComponentId, mut visit: F)
    where
        F: FnMut(ComponentId, &Component) -> bool,
    {
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(id.index()) else {
                continue;
            };
            if visit(id, node) {
                queue.extend(node.children.iter().copied());
            }
        }
    }

    /// Breadth-first walk with mutable access to the whole graph
    ///
    /// Children are read after `visit` returns, so the callback may change
    /// the node it is given (but not re-link the tree).
    pub fn visit_breadth_first_mut<F>(&mut self, start: ComponentId, mut visit: F)
    where
        F: FnMut(&mut ComponentGraph, ComponentId) -> bool,
    {
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(id) = queue.pop_front() {
            if id.index() >= self.nodes.len() {
                continue;
            }
            if visit(self, id) {
                queue.extend(self.nodes[id.index()].children.iter().copied());
            }
        }
    }

    /// Iterate all components in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (ComponentId(i as u32), node))
    }

    /// Components without a parent, excluding the root
    pub fn orphans(&self) -> Vec<ComponentId> {
        self.iter()
            .filter(|(id, node)| node.parent.is_none() && Some(*id) != self.root)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of links from the node up to its topmost ancestor
    pub fn depth(&self, id: ComponentId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(Component::parent);
        while let Some(parent) = current {
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
            current = self.get(parent).and_then(Component::parent);
        }
        depth
    }

    pub fn components_of_kind(&self, kind: ComponentKind) -> Vec<ComponentId> {
        self.iter()
            .filter(|(_, node)| node.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Case-insensitive substring search over display names
    pub fn find_by_name(&self, query: &str) -> Vec<ComponentId> {
        let query = query.to_lowercase();
        self.iter()
            .filter(|(_, node)| node.name.to_lowercase().contains(&query))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().map(|n| n.meshes.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(Component::triangle_count).sum()
    }

    fn check(&self, id: ComponentId) -> Result<(), GraphError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownComponent(id))
        }
    }
}

impl Index<ComponentId> for ComponentGraph {
    type Output = Component;

    fn index(&self, id: ComponentId) -> &Component {
        &self.nodes[id.index()]
    }
}

impl IndexMut<ComponentId> for ComponentGraph {
    fn index_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_resolve_is_idempotent() {
        let mut graph = ComponentGraph::new();
        let a = graph.resolve("42", Some("Wall"));
        let b = graph.resolve("42", None);
        let c = graph.resolve("42", Some("Other name"));
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph[a].name, "Wall");
        assert_eq!(graph[a].numeric_id, Some(42));
    }

    #[test]
    fn test_lazy_name_fill() {
        let mut graph = ComponentGraph::new();
        let a = graph.resolve("w-1", None);
        assert!(graph[a].name.is_empty());
        graph.resolve("w-1", Some("Wall 1"));
        assert_eq!(graph[a].name, "Wall 1");
        assert_eq!(graph[a].numeric_id, None);
    }

    #[test]
    fn test_set_parent_copies_pose() {
        let mut graph = ComponentGraph::new();
        let parent = graph.resolve("p", None);
        let child = graph.resolve("c", None);
        let pose = Transform::new(
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, 1.0),
        );
        graph[parent].transform = pose;

        graph.set_parent(child, parent).unwrap();
        assert_eq!(graph[child].parent(), Some(parent));
        assert_eq!(graph[parent].children(), &[child]);
        assert_eq!(graph[child].transform, pose);
    }

    #[test]
    fn test_parent_assigned_once() {
        let mut graph = ComponentGraph::new();
        let a = graph.resolve("a", None);
        let b = graph.resolve("b", None);
        let c = graph.resolve("c", None);
        graph.set_parent(c, a).unwrap();
        assert_eq!(
            graph.set_parent(c, b),
            Err(GraphError::AlreadyParented {
                child: c,
                parent: a
            })
        );
        assert_eq!(graph[c].parent(), Some(a));
        assert!(graph[b].children().is_empty());
    }

    #[test]
    fn test_cycle_refused() {
        let mut graph = ComponentGraph::new();
        let a = graph.resolve("a", None);
        let b = graph.resolve("b", None);
        let c = graph.resolve("c", None);
        graph.set_parent(b, a).unwrap();
        graph.set_parent(c, b).unwrap();
        assert_eq!(
            graph.set_parent(a, c),
            Err(GraphError::Cycle {
                child: a,
                parent: c
            })
        );
        assert_eq!(graph.set_parent(a, a), Err(GraphError::SelfParent(a)));
    }

    #[test]
    fn test_attribute_reverse_index() {
        let mut graph = ComponentGraph::new();
        let a = graph.resolve("a", None);
        let b = graph.resolve("b", None);
        graph.index_attribute(a, Attribute::new("Fire", "REI 30")).unwrap();
        graph.index_attribute(a, Attribute::new("Fire", "REI 60")).unwrap();
        graph.index_attribute(b, Attribute::new("Fire", "REI 90")).unwrap();

        assert_eq!(graph[a].attributes.len(), 2);
        assert_eq!(graph.components_with_attribute("Fire"), &[a, a, b]);
        assert!(graph.components_with_attribute("Missing").is_empty());
    }

    #[test]
    fn test_unknown_component() {
        let mut graph = ComponentGraph::new();
        let err = graph
            .index_attribute(ComponentId(3), Attribute::new("x", "y"))
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownComponent(ComponentId(3)));
    }

    #[test]
    fn test_breadth_first_order_and_pruning() {
        let mut graph = ComponentGraph::new();
        let root = graph.resolve("root", None);
        let a = graph.resolve("a", None);
        let b = graph.resolve("b", None);
        let a1 = graph.resolve("a1", None);
        let b1 = graph.resolve("b1", None);
        graph.set_parent(a, root).unwrap();
        graph.set_parent(b, root).unwrap();
        graph.set_parent(a1, a).unwrap();
        graph.set_parent(b1, b).unwrap();

        let mut order = Vec::new();
        graph.visit_breadth_first(root, |id, _| {
            order.push(id);
            true
        });
        assert_eq!(order, vec![root, a, b, a1, b1]);

        let mut pruned = Vec::new();
        graph.visit_breadth_first(root, |id, node| {
            pruned.push(id);
            node.external_id != "b"
        });
        assert_eq!(pruned, vec![root, a, b, a1]);
    }

    #[test]
    fn test_deep_chain_traversal() {
        let mut graph = ComponentGraph::new();
        let mut parent = graph.resolve("0", None);
        let root = parent;
        for i in 1..5_000 {
            let child = graph.resolve(&i.to_string(), None);
            graph.set_parent(child, parent).unwrap();
            parent = child;
        }
        let mut count = 0;
        graph.visit_breadth_first(root, |_, _| {
            count += 1;
            true
        });
        assert_eq!(count, 5_000);
    }

    #[test]
    fn test_material_slots() {
        let mut graph = ComponentGraph::new();
        let early = graph.material_slot("m1");
        assert!(!graph.material(early).unwrap().defined);

        let defined = graph
            .define_material(Material::from_rgb8("m1", "Concrete", [200, 200, 200], 0.0))
            .unwrap();
        assert_eq!(early, defined);
        assert_eq!(graph.material(early).unwrap().name, "Concrete");

        let again = graph.define_material(Material::from_rgb8("m1", "Other", [0, 0, 0], 0.0));
        assert!(again.is_none());
        assert_eq!(graph.material(early).unwrap().name, "Concrete");
    }

    #[test]
    fn test_transparent_variant_created_once() {
        let mut graph = ComponentGraph::new();
        let base = graph
            .define_material(Material::from_rgb8("m1", "Glass", [0, 0, 255], 0.0))
            .unwrap();
        let t1 = graph.transparent_variant(base, 0.3).unwrap();
        let t2 = graph.transparent_variant(base, 0.3).unwrap();
        assert_eq!(t1, t2);
        assert_eq!(graph.materials().len(), 2);
    }

    #[test]
    fn test_reset() {
        let mut graph = ComponentGraph::new();
        let a = graph.resolve("a", None);
        graph.set_root(a);
        graph.index_attribute(a, Attribute::new("n", "v")).unwrap();
        graph.material_slot("m");
        graph.reset();
        assert!(graph.is_empty());
        assert!(graph.root().is_none());
        assert!(graph.materials().is_empty());
        assert!(graph.components_with_attribute("n").is_empty());
        assert!(graph.lookup("a").is_none());
    }

    #[test]
    fn test_orphans_and_depth() {
        let mut graph = ComponentGraph::new();
        let root = graph.resolve("root", None);
        graph.set_root(root);
        let a = graph.resolve("a", None);
        let b = graph.resolve("b", None);
        graph.set_parent(a, root).unwrap();
        assert_eq!(graph.orphans(), vec![b]);
        assert_eq!(graph.depth(a), 1);
        assert_eq!(graph.depth(root), 0);
    }
}
