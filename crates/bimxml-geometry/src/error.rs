// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for mesh partitioning

use thiserror::Error;

/// Geometry processing result type
pub type Result<T> = std::result::Result<T, Error>;

/// Geometry-local errors
///
/// None of these stop meshing; the offending triangle or point is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Two or more corners share a point index
    #[error("Degenerate triangle ({0}, {1}, {2}): repeated point index")]
    DegenerateTriangle(u32, u32, u32),

    /// Corner index beyond the point list
    #[error("Point index {index} out of range ({count} points)")]
    IndexOutOfRange { index: u32, count: usize },

    /// Corner references a point whose coordinates could not be read
    #[error("Point {0} has no valid coordinates")]
    InvalidPoint(u32),

    /// Distinct corners, but collinear or coincident positions
    #[error("Triangle ({0}, {1}, {2}) has zero area")]
    ZeroAreaTriangle(u32, u32, u32),

    /// Walk reached a point that is not a corner of the triangle being resolved
    #[error("Point {point} is not a corner of triangle {triangle}")]
    NotACorner { point: u32, triangle: usize },

    /// Triangle appended outside `start_face` / `end_face`
    #[error("Triangle appended with no open face")]
    NoOpenFace,
}

impl Error {
    /// Create an out-of-range error
    pub fn index_out_of_range(index: u32, count: usize) -> Self {
        Error::IndexOutOfRange { index, count }
    }
}
