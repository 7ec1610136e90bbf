// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named component attributes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved attribute name that sets a component's classification
pub const CLASSIFICATION_ATTRIBUTE: &str = "componentType";

/// Declared data type of an attribute value
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeDataType {
    #[default]
    String,
    Integer,
    Real,
    Boolean,
    /// Any other declared type, kept verbatim
    Custom(String),
}

impl AttributeDataType {
    /// Parse the `dataType` tag of a property element
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "string" | "text" => AttributeDataType::String,
            "int" | "integer" | "long" => AttributeDataType::Integer,
            "real" | "double" | "float" | "number" => AttributeDataType::Real,
            "bool" | "boolean" => AttributeDataType::Boolean,
            _ => AttributeDataType::Custom(tag.trim().to_string()),
        }
    }
}

impl fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDataType::String => f.write_str("string"),
            AttributeDataType::Integer => f.write_str("integer"),
            AttributeDataType::Real => f.write_str("real"),
            AttributeDataType::Boolean => f.write_str("boolean"),
            AttributeDataType::Custom(tag) => f.write_str(tag),
        }
    }
}

/// A single named attribute with its serialized value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Value as it appeared in the file
    pub value: String,
    /// Comparison operator (e.g. `=`, `>=`), if declared
    pub operator: Option<String>,
    /// Declared data type
    pub data_type: AttributeDataType,
}

impl Attribute {
    /// Create a string attribute
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            operator: None,
            data_type: AttributeDataType::String,
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_data_type(mut self, data_type: AttributeDataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Is this the reserved classification attribute
    pub fn is_classification(&self) -> bool {
        self.name == CLASSIFICATION_ATTRIBUTE
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().replace(',', ".").parse().ok()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!(AttributeDataType::parse("Real"), AttributeDataType::Real);
        assert_eq!(AttributeDataType::parse(""), AttributeDataType::String);
        assert_eq!(
            AttributeDataType::parse("length"),
            AttributeDataType::Custom("length".to_string())
        );
    }

    #[test]
    fn test_typed_accessors() {
        let area = Attribute::new("Area", " 12,5 ").with_data_type(AttributeDataType::Real);
        assert_eq!(area.as_f64(), Some(12.5));

        let count = Attribute::new("Count", "7");
        assert_eq!(count.as_i64(), Some(7));

        let external = Attribute::new("IsExternal", "Yes");
        assert_eq!(external.as_bool(), Some(true));
        assert_eq!(Attribute::new("x", "maybe").as_bool(), None);
    }

    #[test]
    fn test_classification_name() {
        assert!(Attribute::new(CLASSIFICATION_ATTRIBUTE, "wall").is_classification());
        assert!(!Attribute::new("Type", "wall").is_classification());
    }
}
