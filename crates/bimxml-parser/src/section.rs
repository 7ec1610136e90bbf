// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level document sections

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four independently readable sections of a document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Materials,
    Hierarchy,
    GeometryData,
    Properties,
}

impl SectionKind {
    /// Sections in drain order
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Materials,
        SectionKind::Hierarchy,
        SectionKind::GeometryData,
        SectionKind::Properties,
    ];

    /// Element name that opens the section
    pub fn tag(&self) -> &'static str {
        match self {
            SectionKind::Materials => "materialSection",
            SectionKind::Hierarchy => "rootContainer",
            SectionKind::GeometryData => "objectDataSection",
            SectionKind::Properties => "propertySection",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Position in [`SectionKind::ALL`]
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
