// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress counters readable from other threads

use crate::SectionKind;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Live import counters
///
/// Shared behind an `Arc`; the importing thread writes, anyone may poll.
/// A section's counters are final once its completion flag reads `true`.
#[derive(Debug, Default)]
pub struct ImportProgress {
    objects: AtomicUsize,
    triangles: AtomicUsize,
    meshes: AtomicUsize,
    sections: [AtomicBool; 4],
}

/// Point-in-time copy of [`ImportProgress`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub objects: usize,
    pub triangles: usize,
    pub meshes: usize,
    pub sections_complete: [bool; 4],
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_object(&self) {
        self.objects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_triangle(&self) {
        self.triangles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_meshes(&self, count: usize) {
        self.meshes.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn complete(&self, kind: SectionKind) {
        self.sections[kind.index()].store(true, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.objects.store(0, Ordering::Relaxed);
        self.triangles.store(0, Ordering::Relaxed);
        self.meshes.store(0, Ordering::Relaxed);
        for flag in &self.sections {
            flag.store(false, Ordering::Release);
        }
    }

    /// Objects read so far
    pub fn objects_read(&self) -> usize {
        self.objects.load(Ordering::Relaxed)
    }

    /// Triangles accepted by the partitioner so far
    pub fn triangles_accepted(&self) -> usize {
        self.triangles.load(Ordering::Relaxed)
    }

    pub fn meshes_emitted(&self) -> usize {
        self.meshes.load(Ordering::Relaxed)
    }

    pub fn is_section_complete(&self, kind: SectionKind) -> bool {
        self.sections[kind.index()].load(Ordering::Acquire)
    }

    pub fn all_sections_complete(&self) -> bool {
        SectionKind::ALL
            .iter()
            .all(|kind| self.is_section_complete(*kind))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let mut sections_complete = [false; 4];
        for kind in SectionKind::ALL {
            sections_complete[kind.index()] = self.is_section_complete(kind);
        }
        ProgressSnapshot {
            objects: self.objects_read(),
            triangles: self.triangles_accepted(),
            meshes: self.meshes_emitted(),
            sections_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_visible_across_threads() {
        let progress = Arc::new(ImportProgress::new());
        let writer = Arc::clone(&progress);
        std::thread::spawn(move || {
            for _ in 0..10 {
                writer.add_object();
            }
            writer.add_meshes(2);
            writer.complete(SectionKind::Hierarchy);
        })
        .join()
        .unwrap();

        assert!(progress.is_section_complete(SectionKind::Hierarchy));
        assert!(!progress.all_sections_complete());
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.objects, 10);
        assert_eq!(snapshot.meshes, 2);
        assert_eq!(snapshot.sections_complete, [false, true, false, false]);

        progress.reset();
        assert_eq!(progress.snapshot(), ProgressSnapshot::default());
    }
}
