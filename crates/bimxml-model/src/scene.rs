// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Result of one import run

use crate::{Component, ComponentGraph, Diagnostic, DiagnosticKind, Material, ModelMetadata};
use serde::{Deserialize, Serialize};

/// Counters gathered while importing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub containers: usize,
    pub objects: usize,
    pub materials: usize,
    pub meshes: usize,
    pub triangles: usize,
    pub attributes_indexed: usize,
    /// Property elements dropped by the allow-list
    pub attributes_filtered: usize,
}

/// A populated component graph plus everything learned about the document
#[derive(Clone, Debug, Default)]
pub struct ImportedModel {
    pub graph: ComponentGraph,
    pub metadata: ModelMetadata,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ImportStats,
}

impl ImportedModel {
    /// Component by external ID
    pub fn component(&self, external_id: &str) -> Option<&Component> {
        self.graph.by_external_id(external_id)
    }

    pub fn materials(&self) -> &[Material] {
        self.graph.materials()
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Discard the graph, metadata and diagnostics before a re-import
    pub fn clean(&mut self) {
        self.graph.reset();
        self.metadata = ModelMetadata::default();
        self.diagnostics.clear();
        self.stats = ImportStats::default();
    }
}
