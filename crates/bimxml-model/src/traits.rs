// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core traits for BIM XML importing

use crate::{ImportedModel, Result};
use std::io::BufRead;

/// Something that can hand out independent forward-only streams over one document
///
/// Each call to [`open`](DocumentSource::open) returns a fresh handle
/// positioned at the start of the document, so several section cursors can
/// read the same document without sharing parse state.
pub trait DocumentSource: Send + Sync {
    /// Open a new stream handle
    fn open(&self) -> Result<Box<dyn BufRead + Send>>;

    /// Human readable description for diagnostics (path, "memory", ...)
    fn describe(&self) -> String;
}

/// Main import interface
///
/// # Example
///
/// ```ignore
/// use bimxml_model::{BimImporter, DocumentSource};
///
/// let importer: Box<dyn BimImporter> = get_importer();
/// let model = importer.import(&source)?;
/// println!("{} components", model.graph.len());
/// ```
pub trait BimImporter: Send + Sync {
    /// Import a document into a fresh model
    fn import(&self, source: &dyn DocumentSource) -> Result<ImportedModel>;

    /// Replace `target` with a fresh import of `source`
    ///
    /// `target` is cleaned first, so a failed import leaves it empty rather
    /// than holding the previous model.
    fn import_into(&self, source: &dyn DocumentSource, target: &mut ImportedModel) -> Result<()> {
        target.clean();
        *target = self.import(source)?;
        Ok(())
    }
}
