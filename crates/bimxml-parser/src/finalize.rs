// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Finalize pass run once every section is drained

use crate::ImportSettings;
use bimxml_model::{
    Attribute, ComponentGraph, ComponentId, ComponentKind, Diagnostic, DiagnosticKind,
    Diagnostics, ImportStats,
};

pub(crate) struct Finalizer<'a> {
    pub graph: &'a mut ComponentGraph,
    pub settings: &'a ImportSettings,
    pub diagnostics: &'a mut Diagnostics,
    pub stats: &'a mut ImportStats,
}

impl Finalizer<'_> {
    /// Index buffered attributes in arrival order, reclassifying on the
    /// classification attribute
    pub fn apply_attributes(&mut self, pending: Vec<(String, Attribute)>) {
        for (ref_id, attribute) in pending {
            let id = self.graph.resolve(&ref_id, None);

            if attribute.is_classification() {
                self.reclassify(id, &attribute.value);
            }

            match self.graph.index_attribute(id, attribute) {
                Ok(()) => self.stats.attributes_indexed += 1,
                Err(err) => self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::Element, err.to_string()).on_element("property"),
                ),
            }
        }
    }

    fn reclassify(&mut self, id: ComponentId, value: &str) {
        let kind = match self.settings.classify(value) {
            Some(kind) => kind,
            None => {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Classification,
                        format!(
                            "unknown classification '{}' on '{}'",
                            value, self.graph[id].external_id
                        ),
                    )
                    .on_element("property"),
                );
                ComponentKind::Uncategorized
            }
        };
        self.graph[id].kind = kind;
    }

    /// Hang every unplaced component under the root
    pub fn attach_orphans(&mut self) {
        let Some(root) = self.graph.root() else {
            return;
        };

        for orphan in self.graph.orphans() {
            match self.graph.set_parent(orphan, root) {
                Ok(()) => self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Structure,
                    format!(
                        "'{}' was referenced but never placed; attached to the root",
                        self.graph[orphan].external_id
                    ),
                )),
                Err(err) => self
                    .diagnostics
                    .push(Diagnostic::new(DiagnosticKind::Structure, err.to_string())),
            }
        }
    }

    /// Mark openings, doors, windows and their subtrees non-constructive
    /// and swap their materials for transparent variants
    pub fn propagate_non_constructive(&mut self) {
        let starts: Vec<ComponentId> = self
            .graph
            .root()
            .into_iter()
            .chain(self.graph.orphans())
            .collect();
        let alpha = self.settings.non_constructive_alpha;

        for start in starts {
            self.graph.visit_breadth_first_mut(start, |graph, id| {
                let inherited = graph[id]
                    .parent()
                    .filter(|&parent| !graph[parent].is_constructive)
                    .map(|parent| graph[parent].kind);

                let node = &mut graph[id];
                match inherited {
                    Some(kind) => {
                        node.is_constructive = false;
                        node.kind = kind;
                    }
                    None if node.kind.is_non_constructive() => node.is_constructive = false,
                    None => {}
                }

                if !node.is_constructive {
                    if let Some(material) = node.material {
                        let variant = graph.transparent_variant(material, alpha);
                        graph[id].material = variant.or(Some(material));
                    }
                }
                true
            });
        }
    }

    /// Materials referenced by `materialID` but never defined
    pub fn report_undefined_materials(&mut self) {
        for material in self.graph.materials() {
            if !material.defined && !material.variant {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Element,
                        format!("material '{}' is referenced but not defined", material.external_id),
                    )
                    .on_element("material"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimxml_model::Material;

    fn run<F>(graph: &mut ComponentGraph, settings: &ImportSettings, f: F) -> Diagnostics
    where
        F: FnOnce(&mut Finalizer<'_>),
    {
        let mut diagnostics = Diagnostics::new();
        let mut stats = ImportStats::default();
        let mut finalizer = Finalizer {
            graph,
            settings,
            diagnostics: &mut diagnostics,
            stats: &mut stats,
        };
        f(&mut finalizer);
        diagnostics
    }

    #[test]
    fn test_attributes_reach_reverse_index() {
        let mut graph = ComponentGraph::new();
        let settings = ImportSettings::default();
        let pending = vec![
            ("o1".to_string(), Attribute::new("FireRating", "REI 60")),
            ("o1".to_string(), Attribute::new("FireRating", "REI 90")),
            ("o2".to_string(), Attribute::new("componentType", "door")),
        ];
        let diagnostics = run(&mut graph, &settings, |f| f.apply_attributes(pending));

        assert!(diagnostics.is_empty());
        let o1 = graph.lookup("o1").unwrap();
        let o2 = graph.lookup("o2").unwrap();
        assert_eq!(graph[o1].attributes.len(), 2);
        assert_eq!(graph.components_with_attribute("FireRating"), &[o1, o1]);
        assert_eq!(graph.components_with_attribute("componentType"), &[o2]);
        assert_eq!(graph[o2].kind, ComponentKind::Door);
    }

    #[test]
    fn test_unknown_and_ignored_classification() {
        let mut graph = ComponentGraph::new();
        let wall = graph.resolve("a", None);
        graph[wall].kind = ComponentKind::Wall;
        let settings = ImportSettings::default().ignore_classification("Proxy");
        let pending = vec![
            ("a".to_string(), Attribute::new("componentType", "warp core")),
            ("b".to_string(), Attribute::new("componentType", "proxy")),
        ];
        let diagnostics = run(&mut graph, &settings, |f| f.apply_attributes(pending));

        assert_eq!(diagnostics.count(DiagnosticKind::Classification), 1);
        assert_eq!(graph[wall].kind, ComponentKind::Uncategorized);
        let b = graph.lookup("b").unwrap();
        assert_eq!(graph[b].kind, ComponentKind::Uncategorized);
    }

    #[test]
    fn test_non_constructive_subtree() {
        let mut graph = ComponentGraph::new();
        let root = graph.resolve("root", None);
        graph.set_root(root);
        let wall = graph.resolve("wall", None);
        let opening = graph.resolve("opening", None);
        let frame = graph.resolve("frame", None);
        let pane = graph.resolve("pane", None);
        graph.set_parent(wall, root).unwrap();
        graph.set_parent(opening, wall).unwrap();
        graph.set_parent(frame, opening).unwrap();
        graph.set_parent(pane, frame).unwrap();
        graph[wall].kind = ComponentKind::Wall;
        graph[opening].kind = ComponentKind::Window;
        graph[frame].kind = ComponentKind::Other;

        let glass = graph.define_material(Material::from_rgb8("g", "Glass", [0, 0, 255], 0.0));
        graph[pane].material = glass;
        graph[wall].material = glass;

        let settings = ImportSettings::default().with_non_constructive_alpha(0.5);
        run(&mut graph, &settings, |f| f.propagate_non_constructive());

        assert!(graph[root].is_constructive);
        assert!(graph[wall].is_constructive);
        for id in [opening, frame, pane] {
            assert!(!graph[id].is_constructive);
            assert_eq!(graph[id].kind, ComponentKind::Window);
        }

        assert_eq!(graph[wall].material, glass);
        let variant = graph[pane].material.unwrap();
        assert_ne!(Some(variant), glass);
        let variant = graph.material(variant).unwrap();
        assert_eq!(variant.alpha, 0.5);
        assert_eq!(variant.name, "Glass (transparent)");
        assert_eq!(graph.materials().len(), 2);
    }

    #[test]
    fn test_orphans_attached_to_root() {
        let mut graph = ComponentGraph::new();
        let root = graph.resolve("root", None);
        graph.set_root(root);
        let lost = graph.resolve("lost", None);
        let child = graph.resolve("child", None);
        graph.set_parent(child, lost).unwrap();

        let settings = ImportSettings::default();
        let diagnostics = run(&mut graph, &settings, |f| f.attach_orphans());

        assert_eq!(graph[lost].parent(), Some(root));
        assert_eq!(graph[child].parent(), Some(lost));
        assert!(graph.orphans().is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::Structure), 1);
    }

    #[test]
    fn test_undefined_material_reported() {
        let mut graph = ComponentGraph::new();
        graph.material_slot("ghost");
        graph.define_material(Material::from_rgb8("real", "Real", [1, 2, 3], 0.0));
        let settings = ImportSettings::default();
        let diagnostics = run(&mut graph, &settings, |f| f.report_undefined_materials());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_variants_excluded_by_flag_not_name() {
        let mut graph = ComponentGraph::new();
        let ghost = graph.material_slot("ghost");
        graph.material_slot("glass#transparent");
        let variant = graph.transparent_variant(ghost, 0.3).unwrap();
        assert!(graph.material(variant).unwrap().variant);

        let settings = ImportSettings::default();
        let diagnostics = run(&mut graph, &settings, |f| f.report_undefined_materials());
        let mut reported: Vec<_> = diagnostics
            .iter()
            .map(|d| d.message.clone())
            .collect();
        reported.sort();
        assert_eq!(
            reported,
            vec![
                "material 'ghost' is referenced but not defined".to_string(),
                "material 'glass#transparent' is referenced but not defined".to_string(),
            ]
        );
    }
}
