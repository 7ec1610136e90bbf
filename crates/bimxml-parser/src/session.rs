// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stepwise import sessions
//!
//! A session owns the scene builder and one or four cursors. Callers may
//! advance individual sections a token at a time, in any interleaving, and
//! poll [`ImportProgress`] in between; [`ImportSession::finish`] drains
//! whatever is left and runs the finalize pass.

use crate::{CursorMode, ImportProgress, ImportSettings, SceneBuilder, SectionCursor, SectionKind};
use bimxml_model::{ComponentGraph, DocumentSource, ImportedModel, Result};
use std::io::BufRead;
use std::sync::Arc;

type Stream = Box<dyn BufRead + Send>;

enum Cursors {
    /// One cursor serving every section in document order
    Single(Box<SectionCursor<Stream>>),
    /// One cursor per section, indexed by [`SectionKind::index`]
    FannedOut(Vec<SectionCursor<Stream>>),
}

/// An import in progress
pub struct ImportSession {
    builder: SceneBuilder,
    cursors: Cursors,
    description: String,
}

impl ImportSession {
    /// Open a session using the cursor mode from `settings`
    pub fn new(source: &dyn DocumentSource, settings: ImportSettings) -> Result<Self> {
        Self::with_progress(source, settings, Arc::new(ImportProgress::new()))
    }

    /// Open a session that reports into an existing set of counters
    pub fn with_progress(
        source: &dyn DocumentSource,
        settings: ImportSettings,
        progress: Arc<ImportProgress>,
    ) -> Result<Self> {
        let cursors = match settings.cursor_mode {
            CursorMode::Single => Cursors::Single(Box::new(SectionCursor::new(source.open()?))),
            CursorMode::FannedOut => {
                let mut cursors = Vec::with_capacity(SectionKind::ALL.len());
                for kind in SectionKind::ALL {
                    cursors.push(SectionCursor::for_sections(
                        source.open()?,
                        &[kind],
                        kind == SectionKind::Hierarchy,
                    ));
                }
                Cursors::FannedOut(cursors)
            }
        };
        Ok(Self {
            builder: SceneBuilder::with_progress(settings, progress),
            cursors,
            description: source.describe(),
        })
    }

    /// One forward cursor over the whole document
    pub fn single(source: &dyn DocumentSource, settings: ImportSettings) -> Result<Self> {
        Self::new(source, settings.with_cursor_mode(CursorMode::Single))
    }

    /// Four cursors, each over its own stream handle
    ///
    /// The hierarchy cursor reports the document root and metadata.
    pub fn fanned_out(source: &dyn DocumentSource, settings: ImportSettings) -> Result<Self> {
        Self::new(source, settings.with_cursor_mode(CursorMode::FannedOut))
    }

    /// Advance the cursor serving `kind` by one token
    ///
    /// With a single cursor every call advances the same cursor, whatever
    /// the section. Returns `false` once that cursor has nothing left.
    pub fn step(&mut self, kind: SectionKind) -> Result<bool> {
        let cursor = match &mut self.cursors {
            Cursors::Single(cursor) => cursor.as_mut(),
            Cursors::FannedOut(cursors) => &mut cursors[kind.index()],
        };
        let more = cursor.advance(&mut self.builder)?;

        if !more {
            // Absent sections never fire an end callback
            let progress = self.builder.progress();
            match self.cursors {
                Cursors::Single(_) => SectionKind::ALL.iter().for_each(|k| progress.complete(*k)),
                Cursors::FannedOut(_) => progress.complete(kind),
            }
        }
        Ok(more)
    }

    /// Step `kind` until its cursor is done
    pub fn drain(&mut self, kind: SectionKind) -> Result<()> {
        while self.step(kind)? {}
        Ok(())
    }

    pub fn is_complete(&self, kind: SectionKind) -> bool {
        match &self.cursors {
            Cursors::Single(cursor) => cursor.is_done(),
            Cursors::FannedOut(cursors) => cursors[kind.index()].is_done(),
        }
    }

    /// Counters shared with the builder
    pub fn progress(&self) -> Arc<ImportProgress> {
        Arc::clone(self.builder.progress())
    }

    /// Graph as built so far
    pub fn graph(&self) -> &ComponentGraph {
        self.builder.graph()
    }

    /// Drain remaining sections (materials, hierarchy, geometry,
    /// properties) and finalize
    pub fn finish(mut self) -> Result<ImportedModel> {
        for kind in SectionKind::ALL {
            self.drain(kind)?;
        }
        log::debug!("finalizing import of {}", self.description);
        Ok(self.builder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;

    const DOC: &str = r#"<doc projectID="P">
      <propertySection>
        <property name="componentType" refID="o1">slab</property>
      </propertySection>
      <rootContainer ID="c0">
        <object3D ID="o1" name="Floor"/>
      </rootContainer>
      <objectDataSection>
        <data3D refID="o1">
          <p x="0" y="0" z="0"/><p x="1" y="0" z="0"/><p x="0" y="1" z="0"/>
          <face><t p1="0" p2="1" p3="2"/></face>
        </data3D>
      </objectDataSection>
    </doc>"#;

    #[test]
    fn test_interleaved_steps() {
        let source = MemorySource::from(DOC);
        let mut session = ImportSession::fanned_out(&source, ImportSettings::default()).unwrap();
        let progress = session.progress();

        // Geometry first: the target is created by forward reference
        session.drain(SectionKind::GeometryData).unwrap();
        assert!(session.is_complete(SectionKind::GeometryData));
        assert!(progress.is_section_complete(SectionKind::GeometryData));
        assert_eq!(progress.meshes_emitted(), 1);
        let o1 = session.graph().lookup("o1").unwrap();
        assert!(session.graph()[o1].parent().is_none());

        session.step(SectionKind::Hierarchy).unwrap();
        session.step(SectionKind::Properties).unwrap();
        assert!(!session.is_complete(SectionKind::Hierarchy));

        let model = session.finish().unwrap();
        let floor = model.component("o1").unwrap();
        assert_eq!(floor.kind, bimxml_model::ComponentKind::Slab);
        assert_eq!(floor.name, "Floor");
        assert_eq!(floor.meshes.len(), 1);
        let c0 = model.graph.lookup("c0").unwrap();
        assert_eq!(floor.parent(), Some(c0));
        assert!(progress.all_sections_complete());
    }

    #[test]
    fn test_single_and_fanned_agree() {
        let source = MemorySource::from(DOC);
        let single = ImportSession::single(&source, ImportSettings::default())
            .unwrap()
            .finish()
            .unwrap();
        let fanned = ImportSession::fanned_out(&source, ImportSettings::default())
            .unwrap()
            .finish()
            .unwrap();

        assert_eq!(single.graph.len(), fanned.graph.len());
        assert_eq!(single.stats, fanned.stats);
        for (id, node) in single.graph.iter() {
            let other = fanned.component(&node.external_id).unwrap();
            assert_eq!(node.kind, other.kind);
            assert_eq!(
                node.parent().map(|p| &single.graph[p].external_id),
                other.parent().map(|p| &fanned.graph[p].external_id),
                "parent of {}",
                id
            );
        }
    }

    #[test]
    fn test_shared_progress_handle() {
        let source = MemorySource::from(DOC);
        let progress = Arc::new(ImportProgress::new());
        let session =
            ImportSession::with_progress(&source, ImportSettings::default(), Arc::clone(&progress))
                .unwrap();
        assert!(Arc::ptr_eq(&session.progress(), &progress));

        session.finish().unwrap();
        assert_eq!(progress.objects_read(), 1);
        assert_eq!(progress.meshes_emitted(), 1);
        assert!(progress.all_sections_complete());
    }
}
