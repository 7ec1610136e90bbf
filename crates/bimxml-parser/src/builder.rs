// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene builder: turns cursor callbacks into a component graph

use crate::handler::{
    DocumentInfo, MaterialInfo, MetadataInfo, NodeInfo, PropertyInfo, SectionHandler,
};
use crate::{finalize, ImportProgress, ImportSettings, SectionKind};
use bimxml_geometry::{MeshPartitioner, Point3};
use bimxml_model::{
    Attribute, AttributeDataType, ComponentGraph, ComponentId, ComponentKind, Diagnostic,
    DiagnosticKind, Diagnostics, GraphError, ImportStats, ImportedModel, Material, MeshSegment,
    ModelMetadata,
};
use smallvec::SmallVec;
use std::sync::Arc;

/// Fallback project ID when the root carries neither `projectID` nor `sourceFileName`
const DEFAULT_PROJECT_ID: &str = "project";

enum GeometryState {
    Idle,
    Meshing {
        target: ComponentId,
        partitioner: MeshPartitioner<Vec<MeshSegment>>,
    },
}

/// Single-owner sink for every section's callbacks
///
/// All graph and partitioner mutation happens here. Properties are held in a
/// side buffer keyed by their target ID and applied by [`finish`](Self::finish).
pub struct SceneBuilder {
    settings: ImportSettings,
    graph: ComponentGraph,
    metadata: ModelMetadata,
    metadata_seen: bool,
    parents: Vec<ComponentId>,
    geometry: GeometryState,
    pending_attributes: Vec<(String, Attribute)>,
    diagnostics: Diagnostics,
    stats: ImportStats,
    progress: Arc<ImportProgress>,
}

impl SceneBuilder {
    pub fn new(settings: ImportSettings) -> Self {
        Self::with_progress(settings, Arc::new(ImportProgress::new()))
    }

    pub fn with_progress(settings: ImportSettings, progress: Arc<ImportProgress>) -> Self {
        Self {
            settings,
            graph: ComponentGraph::new(),
            metadata: ModelMetadata::default(),
            metadata_seen: false,
            parents: Vec::new(),
            geometry: GeometryState::Idle,
            pending_attributes: Vec::new(),
            diagnostics: Diagnostics::new(),
            stats: ImportStats::default(),
            progress,
        }
    }

    /// Graph as built so far (attributes not yet applied)
    pub fn graph(&self) -> &ComponentGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn progress(&self) -> &Arc<ImportProgress> {
        &self.progress
    }

    /// Properties waiting for the finalize pass
    pub fn pending_attribute_count(&self) -> usize {
        self.pending_attributes.len()
    }

    /// Apply buffered attributes, repair the tree, propagate classification
    /// and hand out the model
    pub fn finish(mut self) -> ImportedModel {
        self.close_geometry();

        let pending = std::mem::take(&mut self.pending_attributes);
        let mut finalizer = finalize::Finalizer {
            graph: &mut self.graph,
            settings: &self.settings,
            diagnostics: &mut self.diagnostics,
            stats: &mut self.stats,
        };
        finalizer.apply_attributes(pending);
        finalizer.attach_orphans();
        finalizer.propagate_non_constructive();
        finalizer.report_undefined_materials();

        log::info!(
            "imported '{}': {} components, {} meshes, {} triangles, {} diagnostics",
            self.metadata.project_id,
            self.graph.len(),
            self.stats.meshes,
            self.stats.triangles,
            self.diagnostics.len()
        );

        ImportedModel {
            graph: self.graph,
            metadata: self.metadata,
            diagnostics: self.diagnostics.into_vec(),
            stats: self.stats,
        }
    }

    fn structure(&mut self, message: String) {
        self.diagnostics
            .push(Diagnostic::new(DiagnosticKind::Structure, message));
    }

    /// Parent for a node without an explicit back-reference
    fn implicit_parent(&self) -> Option<ComponentId> {
        self.parents.last().copied().or_else(|| self.graph.root())
    }

    /// Place `child` under its explicit or implicit parent
    ///
    /// A refused explicit link falls back to the parent stack, then the root.
    fn place(&mut self, child: ComponentId, ref_id: Option<&str>) {
        if Some(child) == self.graph.root() {
            return;
        }

        let explicit = ref_id.map(|r| self.graph.resolve(r, None));
        let mut candidates: SmallVec<[ComponentId; 3]> = SmallVec::new();
        for parent in explicit
            .into_iter()
            .chain(self.implicit_parent())
            .chain(self.graph.root())
        {
            if !candidates.contains(&parent) {
                candidates.push(parent);
            }
        }

        for parent in candidates {
            match self.graph.set_parent(child, parent) {
                Ok(()) => return,
                Err(GraphError::AlreadyParented { parent: existing, .. }) => {
                    if existing != parent {
                        let message = format!(
                            "'{}' is already placed under '{}'",
                            self.graph[child].external_id, self.graph[existing].external_id
                        );
                        self.structure(message);
                    }
                    return;
                }
                Err(err) => {
                    let message = format!(
                        "cannot place '{}' under '{}': {}",
                        self.graph[child].external_id, self.graph[parent].external_id, err
                    );
                    self.structure(message);
                }
            }
        }
    }

    fn classify(&mut self, id: ComponentId, value: &str, element: &str) {
        let kind = match self.settings.classify(value) {
            Some(kind) => kind,
            None => {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::Classification,
                    format!(
                        "unknown classification '{}' on '{}'",
                        value, self.graph[id].external_id
                    ),
                )
                .on_element(element);
                self.diagnostics.push(diagnostic);
                ComponentKind::Uncategorized
            }
        };
        self.graph[id].kind = kind;
    }

    fn close_geometry(&mut self) {
        let GeometryState::Meshing {
            target,
            mut partitioner,
        } = std::mem::replace(&mut self.geometry, GeometryState::Idle)
        else {
            return;
        };

        partitioner.end_face();
        self.drain_geometry_warnings(&mut partitioner);

        let segments = partitioner.end_meshing();
        let triangles: usize = segments.iter().map(MeshSegment::triangle_count).sum();
        self.stats.meshes += segments.len();
        self.stats.triangles += triangles;
        self.progress.add_meshes(segments.len());

        if segments.is_empty() {
            log::debug!("'{}' has no valid geometry", self.graph[target].external_id);
        }
        self.graph[target].meshes.extend(segments);
    }

    fn drain_geometry_warnings(&mut self, partitioner: &mut MeshPartitioner<Vec<MeshSegment>>) {
        for warning in partitioner.take_warnings() {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::Geometry,
                    format!("{}: {}", partitioner.name(), warning),
                )
                .on_element("face"),
            );
        }
    }
}

impl SectionHandler for SceneBuilder {
    fn on_document(&mut self, info: &DocumentInfo) {
        let project_id = match (&info.project_id, &info.source_file_name) {
            (Some(id), _) => id.clone(),
            (None, fallback) => {
                let id = fallback
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Element,
                        format!("missing projectID, using '{}'", id),
                    )
                    .on_element(info.tag.as_str()),
                );
                id
            }
        };

        let display = info.source_file_name.as_deref().unwrap_or(&project_id);
        let root = self.graph.resolve(&project_id, Some(display));
        let node = &mut self.graph[root];
        node.kind = ComponentKind::Container;
        node.is_grouping = true;
        self.graph.set_root(root);

        self.metadata.project_id = project_id;
        self.metadata.source_file_name = info.source_file_name.clone();
    }

    fn on_metadata(&mut self, info: &MetadataInfo) {
        if self.metadata_seen {
            return;
        }
        self.metadata_seen = true;
        self.metadata.name = info.name.clone();
        self.metadata.description = info.description.clone();
    }

    fn on_section_start(&mut self, kind: SectionKind) {
        log::debug!("reading <{}>", kind);
    }

    fn on_section_end(&mut self, kind: SectionKind) {
        if kind == SectionKind::GeometryData {
            self.close_geometry();
        }
        if kind == SectionKind::Hierarchy && !self.parents.is_empty() {
            self.parents.clear();
        }
        self.progress.complete(kind);
    }

    fn on_material(&mut self, info: &MaterialInfo) {
        let name = info.name.as_deref().unwrap_or(&info.id);
        let material = Material::from_rgb8(&info.id, name, info.rgb, info.transparency);
        if self.graph.define_material(material).is_some() {
            self.stats.materials += 1;
        } else {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::Element,
                    format!("material '{}' defined more than once", info.id),
                )
                .on_element("material"),
            );
        }
    }

    fn on_container_start(&mut self, info: &NodeInfo) {
        let id = self.graph.resolve(&info.id, info.name.as_deref());
        self.stats.containers += 1;

        self.place(id, info.ref_id.as_deref());
        let node = &mut self.graph[id];
        node.is_grouping = true;
        if node.kind == ComponentKind::Uncategorized {
            node.kind = ComponentKind::Container;
        }
        self.parents.push(id);
    }

    fn on_container_end(&mut self) {
        self.parents.pop();
    }

    fn on_object(&mut self, info: &NodeInfo) {
        let id = self.graph.resolve(&info.id, info.name.as_deref());
        self.stats.objects += 1;
        self.progress.add_object();

        self.place(id, info.ref_id.as_deref());
        if let Some(kind) = &info.kind {
            self.classify(id, kind, "object3D");
        }
        if let Some(material_id) = &info.material_id {
            let material = self.graph.material_slot(material_id);
            self.graph[id].material = Some(material);
        }
    }

    fn on_geometry_start(&mut self, ref_id: &str) {
        self.close_geometry();

        let target = self.graph.resolve(ref_id, None);
        let node = &self.graph[target];
        let name = if node.name.is_empty() {
            node.external_id.clone()
        } else {
            node.name.clone()
        };
        let partitioner =
            MeshPartitioner::start_meshing(name, self.settings.partition_options(), Vec::new());
        self.geometry = GeometryState::Meshing {
            target,
            partitioner,
        };
    }

    fn on_point(&mut self, point: Option<[f64; 3]>) {
        if let GeometryState::Meshing { partitioner, .. } = &mut self.geometry {
            match point {
                Some([x, y, z]) => partitioner.append_point(Point3::new(x, y, z)),
                None => partitioner.append_invalid_point(),
            };
        }
    }

    fn on_face_start(&mut self) {
        if let GeometryState::Meshing { partitioner, .. } = &mut self.geometry {
            partitioner.start_face();
        }
    }

    fn on_triangle(&mut self, [a, b, c]: [u32; 3]) {
        let GeometryState::Meshing { partitioner, .. } = &mut self.geometry else {
            return;
        };
        match partitioner.append_triangle(a, b, c) {
            Ok(()) => self.progress.add_triangle(),
            Err(err) => {
                let message = format!("{}: {}", partitioner.name(), err);
                self.diagnostics
                    .push(Diagnostic::new(DiagnosticKind::Geometry, message).on_element("t"));
            }
        }
    }

    fn on_face_end(&mut self) {
        let mut state = std::mem::replace(&mut self.geometry, GeometryState::Idle);
        if let GeometryState::Meshing { partitioner, .. } = &mut state {
            partitioner.end_face();
            self.drain_geometry_warnings(partitioner);
        }
        self.geometry = state;
    }

    fn on_geometry_end(&mut self) {
        self.close_geometry();
    }

    fn on_property(&mut self, info: &PropertyInfo) {
        if !self.settings.is_attribute_allowed(&info.name) {
            log::debug!("property '{}' not in allow-list", info.name);
            self.stats.attributes_filtered += 1;
            return;
        }

        let mut attribute = Attribute::new(&info.name, &info.value);
        if let Some(operator) = &info.operator {
            attribute = attribute.with_operator(operator);
        }
        if let Some(data_type) = &info.data_type {
            attribute = attribute.with_data_type(AttributeDataType::parse(data_type));
        }
        self.pending_attributes.push((info.ref_id.clone(), attribute));
    }

    fn on_malformed(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
