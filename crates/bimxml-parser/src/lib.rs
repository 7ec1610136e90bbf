// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIMXML-Lite Parser - Streaming multi-section BIM XML reader
//!
//! This crate reads BIM XML documents into a [`ComponentGraph`] with
//! attached mesh segments. It implements the traits defined in
//! `bimxml-model`.
//!
//! # Features
//!
//! - **Streaming** - forward-only `quick-xml` cursors, no DOM
//! - **Sections in any order** - materials, hierarchy, geometry and
//!   properties are correlated by ID through the component graph
//! - **Fan-out** - one cursor per section, optionally on worker threads
//! - **Stepwise sessions** with pollable progress counters
//! - **Absorbed errors** - malformed elements become [`Diagnostic`]s
//!
//! # Example
//!
//! ```
//! use bimxml_parser::{BimXmlImporter, ImportSettings, MemorySource};
//! use bimxml_model::BimImporter;
//!
//! let xml = r#"<model projectID="demo">
//!   <rootContainer ID="site" name="Site">
//!     <object3D ID="w1" name="Wall" type="wall"/>
//!   </rootContainer>
//!   <propertySection>
//!     <property name="FireRating" refID="w1">REI 60</property>
//!   </propertySection>
//! </model>"#;
//!
//! let importer = BimXmlImporter::with_settings(
//!     ImportSettings::default().allow_attribute("FireRating"),
//! );
//! let model = importer.import(&MemorySource::from(xml)).unwrap();
//!
//! let wall = model.component("w1").unwrap();
//! assert_eq!(wall.attribute("FireRating").unwrap().value, "REI 60");
//! ```
//!
//! [`ComponentGraph`]: bimxml_model::ComponentGraph
//! [`Diagnostic`]: bimxml_model::Diagnostic

mod builder;
mod cursor;
mod finalize;
pub mod handler;
mod progress;
mod section;
mod session;
mod settings;
mod source;
mod threaded;

pub use builder::SceneBuilder;
pub use cursor::{CursorState, SectionCursor};
pub use handler::{SectionEvent, SectionHandler};
pub use progress::{ImportProgress, ProgressSnapshot};
pub use section::SectionKind;
pub use session::ImportSession;
pub use settings::{CursorMode, ImportSettings};
pub use source::{FileSource, MemorySource};
pub use threaded::{import_threaded, LANE_CAPACITY};

use bimxml_model::{BimImporter, DocumentSource, ImportedModel, Result};
use std::path::Path;
use std::sync::Arc;

/// Main BIM XML importer implementing the `BimImporter` trait
#[derive(Clone, Debug, Default)]
pub struct BimXmlImporter {
    settings: ImportSettings,
    progress: Arc<ImportProgress>,
}

impl BimXmlImporter {
    /// Create an importer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ImportSettings) -> Self {
        Self {
            settings,
            progress: Arc::new(ImportProgress::new()),
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Counters of the import currently running (or last run)
    ///
    /// Every cursor mode reports here. Poll from another thread while
    /// `import` blocks.
    pub fn progress(&self) -> Arc<ImportProgress> {
        Arc::clone(&self.progress)
    }
}

impl BimImporter for BimXmlImporter {
    fn import(&self, source: &dyn DocumentSource) -> Result<ImportedModel> {
        log::debug!("importing {}", source.describe());
        self.progress.reset();

        if self.settings.threaded {
            return import_threaded(source, self.settings.clone(), self.progress());
        }
        ImportSession::with_progress(source, self.settings.clone(), self.progress())?.finish()
    }
}

/// Import an in-memory document with default settings
pub fn import_str(xml: &str) -> Result<ImportedModel> {
    BimXmlImporter::new().import(&MemorySource::from(xml))
}

/// Import a file with the given settings
pub fn import_file(path: impl AsRef<Path>, settings: ImportSettings) -> Result<ImportedModel> {
    BimXmlImporter::with_settings(settings).import(&FileSource::new(path.as_ref()))
}
