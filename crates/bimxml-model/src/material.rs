// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared surface materials

use serde::{Deserialize, Serialize};

/// Default color for materials referenced before (or without) a definition
pub const DEFAULT_MATERIAL_COLOR: [f32; 3] = [0.7, 0.7, 0.7];

/// A surface material shared by reference between components
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// External material ID
    pub external_id: String,
    /// Human readable name
    pub name: String,
    /// Base color, each channel 0.0-1.0
    pub color: [f32; 3],
    /// Opacity, 1.0 = opaque
    pub alpha: f32,
    /// Whether a `material` element has supplied this material's values
    pub defined: bool,
    /// Derived by [`transparent_variant`](Material::transparent_variant)
    /// rather than read from the document
    #[serde(default)]
    pub variant: bool,
}

impl Material {
    /// Placeholder for an ID that has been referenced but not defined yet
    pub fn placeholder(external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            name: external_id.clone(),
            external_id,
            color: DEFAULT_MATERIAL_COLOR,
            alpha: 1.0,
            defined: false,
            variant: false,
        }
    }

    /// Build from 0-255 channels and a 0-1 transparency
    pub fn from_rgb8(
        external_id: impl Into<String>,
        name: impl Into<String>,
        rgb: [u8; 3],
        transparency: f32,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            color: [
                f32::from(rgb[0]) / 255.0,
                f32::from(rgb[1]) / 255.0,
                f32::from(rgb[2]) / 255.0,
            ],
            alpha: (1.0 - transparency).clamp(0.0, 1.0),
            defined: true,
            variant: false,
        }
    }

    /// RGBA color
    pub fn rgba(&self) -> [f32; 4] {
        [self.color[0], self.color[1], self.color[2], self.alpha]
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
    }

    /// Derived transparent clone used for non-constructive components
    pub fn transparent_variant(&self, alpha: f32) -> Self {
        Self {
            external_id: format!("{}#transparent", self.external_id),
            name: format!("{} (transparent)", self.name),
            color: self.color,
            alpha: alpha.clamp(0.0, 1.0),
            defined: self.defined,
            variant: true,
        }
    }
}
