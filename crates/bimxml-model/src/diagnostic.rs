// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-fatal import diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of the pipeline absorbed the problem
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Missing or unparseable attribute; the element's effect was dropped
    Element,
    /// Rejected triangle or point; meshing continued
    Geometry,
    /// Graph-level repair (orphan attached to root, refused parent link)
    Structure,
    /// Unrecognized classification value folded into `uncategorized`
    Classification,
}

/// A recorded, absorbed problem
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Tag name of the offending element, if any
    pub element: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            element: None,
            message: message.into(),
        }
    }

    /// Attach the offending element's tag name
    pub fn on_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(f, "[{:?}] <{}>: {}", self.kind, element, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Ordered diagnostic sink
///
/// Every pushed diagnostic is also forwarded to `log::warn!`.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Count diagnostics of one kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_element() {
        let d = Diagnostic::new(DiagnosticKind::Element, "missing ID").on_element("object3D");
        assert_eq!(d.to_string(), "[Element] <object3D>: missing ID");
    }

    #[test]
    fn test_count_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(DiagnosticKind::Geometry, "degenerate"));
        diagnostics.push(Diagnostic::new(DiagnosticKind::Element, "bad x"));
        diagnostics.push(Diagnostic::new(DiagnosticKind::Geometry, "degenerate"));
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.count(DiagnosticKind::Geometry), 2);
        assert_eq!(diagnostics.count(DiagnosticKind::Structure), 0);
    }
}
