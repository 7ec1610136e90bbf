// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fanned-out import on worker threads
//!
//! Each section gets a worker that opens its own stream, seeks to its
//! section and forwards events over a channel. The calling thread is the
//! only one that touches the scene builder: it replays the materials
//! channel to exhaustion, then hierarchy, geometry and properties.
//!
//! Lanes are bounded. A worker whose lane is not being drained yet stops
//! once it has queued [`LANE_CAPACITY`] events, so memory stays flat no
//! matter how large the geometry section is.

use crate::handler::{ChannelHandler, SectionEvent};
use crate::{ImportProgress, ImportSettings, SceneBuilder, SectionCursor, SectionKind};
use bimxml_model::{DocumentSource, ImportError, ImportedModel, Result};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Events a worker may queue ahead of the consumer
pub const LANE_CAPACITY: usize = 4096;

/// Import `source` with one worker thread per section
pub fn import_threaded(
    source: &dyn DocumentSource,
    settings: ImportSettings,
    progress: Arc<ImportProgress>,
) -> Result<ImportedModel> {
    import_with_capacity(source, settings, progress, LANE_CAPACITY)
}

fn import_with_capacity(
    source: &dyn DocumentSource,
    settings: ImportSettings,
    progress: Arc<ImportProgress>,
    capacity: usize,
) -> Result<ImportedModel> {
    let mut builder = SceneBuilder::with_progress(settings, progress);

    thread::scope(|scope| -> Result<()> {
        let mut lanes = Vec::with_capacity(SectionKind::ALL.len());
        for kind in SectionKind::ALL {
            let (sender, receiver) = mpsc::sync_channel::<SectionEvent>(capacity);
            let worker = thread::Builder::new()
                .name(format!("bimxml-{}", kind))
                .spawn_scoped(scope, move || -> Result<()> {
                    let stream = source.open()?;
                    let mut cursor =
                        SectionCursor::for_sections(stream, &[kind], kind == SectionKind::Hierarchy);
                    let mut handler = ChannelHandler::new(sender);
                    while cursor.advance(&mut handler)? {
                        if handler.is_disconnected() {
                            break;
                        }
                    }
                    Ok(())
                })?;
            lanes.push((kind, receiver, worker));
        }

        for (kind, receiver, worker) in lanes {
            // Ends when the worker drops its sender
            for event in receiver {
                event.dispatch(&mut builder);
            }
            match worker.join() {
                Ok(Ok(())) => builder.progress().complete(kind),
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    return Err(ImportError::Worker(format!("{} cursor panicked", kind)));
                }
            }
        }
        Ok(())
    })?;

    Ok(builder.finish())
}
