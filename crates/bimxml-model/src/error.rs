// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for BIM XML import operations

use crate::ComponentId;
use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors that abort an import
///
/// Element-local and geometry-local problems never surface here; they are
/// recorded as [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The input could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The XML stream is malformed
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// The stream ended before the document root element was found
    #[error("Document root element not found")]
    MissingRoot,

    /// The stream ended inside a section
    #[error("Stream truncated inside <{section}>")]
    Truncated { section: String },

    /// A section worker thread died
    #[error("Section worker failed: {0}")]
    Worker(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl ImportError {
    /// Create a new XML error
    pub fn xml(position: u64, msg: impl Into<String>) -> Self {
        ImportError::Xml {
            position,
            message: msg.into(),
        }
    }

    /// Create a new truncation error
    pub fn truncated(section: impl Into<String>) -> Self {
        ImportError::Truncated {
            section: section.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        ImportError::Other(msg.into())
    }
}

/// Refused component graph mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Handle does not belong to this graph
    #[error("Unknown component {0}")]
    UnknownComponent(ComponentId),

    /// Component already has a parent
    #[error("Component {child} is already parented to {parent}")]
    AlreadyParented {
        child: ComponentId,
        parent: ComponentId,
    },

    /// Component cannot be its own parent
    #[error("Component {0} cannot parent itself")]
    SelfParent(ComponentId),

    /// Link would close a cycle
    #[error("Parenting {child} under {parent} would create a cycle")]
    Cycle {
        child: ComponentId,
        parent: ComponentId,
    },
}
