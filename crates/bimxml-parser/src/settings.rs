// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import settings

use bimxml_geometry::{PartitionOptions, FORMAT_TRIANGLE_CEILING};
use bimxml_model::{ComponentKind, ImportError, Result, CLASSIFICATION_ATTRIBUTE};
use serde::{Deserialize, Serialize};

/// How sections are read from the document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorMode {
    /// One cursor, sections handled in document order
    #[default]
    Single,
    /// One cursor per section, drained materials first, properties last
    FannedOut,
}

/// Caller-supplied import configuration
///
/// Every field has a default, so a partial JSON object is accepted.
///
/// ```
/// use bimxml_parser::ImportSettings;
///
/// let settings = ImportSettings::from_json(
///     r#"{ "attribute_allow_list": ["FireRating"], "max_triangles_per_mesh": 1000 }"#,
/// )
/// .unwrap();
/// assert!(settings.is_attribute_allowed("FireRating"));
/// assert!(settings.is_attribute_allowed("componentType"));
/// assert_eq!(settings.partition_options().ceiling(), 1000);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Property names to index; the classification attribute always passes
    pub attribute_allow_list: Vec<String>,
    /// Triangle ceiling per mesh segment
    pub max_triangles_per_mesh: usize,
    /// Alpha of the transparent material variant used for non-constructive components
    pub non_constructive_alpha: f32,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub use_light_probes: bool,
    /// Classification values folded into `uncategorized` without a diagnostic
    pub ignored_classifications: Vec<String>,
    pub cursor_mode: CursorMode,
    /// Read fanned-out cursors on worker threads
    pub threaded: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            attribute_allow_list: Vec::new(),
            max_triangles_per_mesh: FORMAT_TRIANGLE_CEILING,
            non_constructive_alpha: 0.3,
            cast_shadows: true,
            receive_shadows: true,
            use_light_probes: true,
            ignored_classifications: Vec::new(),
            cursor_mode: CursorMode::Single,
            threaded: false,
        }
    }
}

impl ImportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ImportError::other(format!("invalid settings: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ImportError::other(e.to_string()))
    }

    /// Replace the attribute allow-list
    pub fn with_allowed_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_allow_list = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add one name to the allow-list
    pub fn allow_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute_allow_list.push(name.into());
        self
    }

    pub fn with_max_triangles(mut self, max_triangles: usize) -> Self {
        self.max_triangles_per_mesh = max_triangles;
        self
    }

    pub fn with_non_constructive_alpha(mut self, alpha: f32) -> Self {
        self.non_constructive_alpha = alpha;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadows = cast;
        self.receive_shadows = receive;
        self
    }

    pub fn with_light_probes(mut self, enabled: bool) -> Self {
        self.use_light_probes = enabled;
        self
    }

    /// Fold `value` into `uncategorized` silently
    pub fn ignore_classification(mut self, value: impl Into<String>) -> Self {
        self.ignored_classifications.push(value.into());
        self
    }

    pub fn with_cursor_mode(mut self, mode: CursorMode) -> Self {
        self.cursor_mode = mode;
        self
    }

    /// Fan out onto worker threads (implies [`CursorMode::FannedOut`])
    pub fn with_threads(mut self, enabled: bool) -> Self {
        self.threaded = enabled;
        if enabled {
            self.cursor_mode = CursorMode::FannedOut;
        }
        self
    }

    /// Whether a property with this name is kept
    pub fn is_attribute_allowed(&self, name: &str) -> bool {
        name == CLASSIFICATION_ATTRIBUTE || self.attribute_allow_list.iter().any(|n| n == name)
    }

    /// Whether a classification value is on the ignore-list
    ///
    /// Compared case-insensitively, ignoring surrounding whitespace.
    pub fn is_classification_ignored(&self, value: &str) -> bool {
        let value = value.trim();
        self.ignored_classifications
            .iter()
            .any(|ignored| ignored.trim().eq_ignore_ascii_case(value))
    }

    /// Map a classification value, honoring the ignore-list
    ///
    /// `None` means the value is neither ignored nor recognized.
    pub fn classify(&self, value: &str) -> Option<ComponentKind> {
        if self.is_classification_ignored(value) {
            return Some(ComponentKind::Uncategorized);
        }
        ComponentKind::from_classification(value)
    }

    /// Options handed to the mesh partitioner
    pub fn partition_options(&self) -> PartitionOptions {
        PartitionOptions {
            max_triangles: self.max_triangles_per_mesh,
            cast_shadows: self.cast_shadows,
            receive_shadows: self.receive_shadows,
            use_light_probes: self.use_light_probes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ImportSettings::default();
        assert_eq!(settings.partition_options().ceiling(), 65_000);
        assert_eq!(settings.cursor_mode, CursorMode::Single);
        assert!(!settings.is_attribute_allowed("FireRating"));
        assert!(settings.is_attribute_allowed(CLASSIFICATION_ATTRIBUTE));
    }

    #[test]
    fn test_partial_json() {
        let settings = ImportSettings::from_json(
            r#"{ "cursor_mode": "fanned_out", "cast_shadows": false, "ignored_classifications": ["Proxy"] }"#,
        )
        .unwrap();
        assert_eq!(settings.cursor_mode, CursorMode::FannedOut);
        assert!(!settings.partition_options().cast_shadows);
        assert!(settings.receive_shadows);
        assert_eq!(settings.classify(" proxy "), Some(ComponentKind::Uncategorized));
        assert_eq!(settings.classify("Wall"), Some(ComponentKind::Wall));
        assert_eq!(settings.classify("Spaceship"), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ImportSettings::from_json("{ \"threaded\": 3 }"),
            Err(ImportError::Other(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let settings = ImportSettings::new()
            .allow_attribute("FireRating")
            .with_max_triangles(10)
            .with_threads(true);
        let json = settings.to_json().unwrap();
        assert_eq!(ImportSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_ceiling_clamped() {
        let settings = ImportSettings::new().with_max_triangles(500_000);
        assert_eq!(settings.partition_options().ceiling(), FORMAT_TRIANGLE_CEILING);
    }
}
