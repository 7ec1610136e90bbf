// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh partitioner
//!
//! Turns one component's raw point list and per-face triangle soup into
//! bounded-size [`MeshSegment`]s with planar UVs.
//!
//! ## Protocol
//!
//! ```text
//! start_meshing(name, options, sink)
//!   append_point(xyz) ...
//!   start_face()  append_triangle(i, j, k) ...  end_face()
//!   ...
//! end_meshing() -> sink
//! ```
//!
//! ## Per-face walk
//!
//! `end_face` walks the face breadth-first over a point -> triangles
//! adjacency map. Each triangle derives its own [`PlanarBasis`]; only the
//! UV offset of the point it was reached from is carried along. A triangle
//! is resolved once, so UVs are continuous along the walk but not
//! necessarily between far-apart regions of one face.
//!
//! When the current buffer reaches the triangle ceiling it is emitted and a
//! new buffer starts with the last two corners of the last triangle, so the
//! walk continues across the seam with the same UVs.

use crate::basis::PlanarBasis;
use crate::{Error, Point3, Result};
use bimxml_model::MeshSegment;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Maximum triangles per mesh the format allows
pub const FORMAT_TRIANGLE_CEILING: usize = 65_000;

/// Receives finished mesh segments
pub trait MeshSink {
    fn emit(&mut self, segment: MeshSegment);
}

impl MeshSink for Vec<MeshSegment> {
    fn emit(&mut self, segment: MeshSegment) {
        self.push(segment);
    }
}

/// Adapts a closure into a [`MeshSink`]
pub struct FnSink<F>(pub F);

impl<F: FnMut(MeshSegment)> MeshSink for FnSink<F> {
    fn emit(&mut self, segment: MeshSegment) {
        (self.0)(segment)
    }
}

/// Partitioning options
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionOptions {
    /// Triangle ceiling per segment, clamped to `1..=FORMAT_TRIANGLE_CEILING`
    pub max_triangles: usize,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub use_light_probes: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            max_triangles: FORMAT_TRIANGLE_CEILING,
            cast_shadows: true,
            receive_shadows: true,
            use_light_probes: true,
        }
    }
}

impl PartitionOptions {
    pub fn with_max_triangles(mut self, max_triangles: usize) -> Self {
        self.max_triangles = max_triangles;
        self
    }

    /// Effective ceiling
    pub fn ceiling(&self) -> usize {
        self.max_triangles.clamp(1, FORMAT_TRIANGLE_CEILING)
    }
}

/// Counters for one meshing run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub points: usize,
    pub faces: usize,
    pub triangles_accepted: usize,
    pub triangles_rejected: usize,
    pub triangles_emitted: usize,
    pub segments_emitted: usize,
}

#[derive(Clone, Copy, Debug)]
struct Vertex {
    /// Index into the raw point list
    source: u32,
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
    tangent: [f32; 4],
}

#[derive(Debug, Default)]
struct SegmentBuffer {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl SegmentBuffer {
    fn push(&mut self, vertex: Vertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Default)]
struct OpenFace {
    triangles: Vec<[u32; 3]>,
    /// Point index -> triangles touching it
    adjacency: FxHashMap<u32, SmallVec<[usize; 6]>>,
}

/// Streaming mesh partitioner for one component
pub struct MeshPartitioner<S: MeshSink> {
    name: String,
    options: PartitionOptions,
    sink: S,
    points: Vec<Option<Point3<f64>>>,
    face: Option<OpenFace>,
    buffer: SegmentBuffer,
    stats: PartitionStats,
    warnings: Vec<Error>,
}

impl<S: MeshSink> MeshPartitioner<S> {
    /// Begin meshing a component; finished segments go to `sink`
    pub fn start_meshing(name: impl Into<String>, options: PartitionOptions, sink: S) -> Self {
        Self {
            name: name.into(),
            options,
            sink,
            points: Vec::new(),
            face: None,
            buffer: SegmentBuffer::default(),
            stats: PartitionStats::default(),
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a point, returning its index
    pub fn append_point(&mut self, point: Point3<f64>) -> u32 {
        self.points.push(Some(point));
        self.stats.points += 1;
        (self.points.len() - 1) as u32
    }

    /// Reserve an index for a point whose coordinates could not be read
    ///
    /// Keeps later indices aligned; triangles using it are rejected.
    pub fn append_invalid_point(&mut self) -> u32 {
        self.points.push(None);
        (self.points.len() - 1) as u32
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Open a new face, closing any face still open
    pub fn start_face(&mut self) {
        if self.face.is_some() {
            log::debug!("{}: face opened while another was open", self.name);
            self.end_face();
        }
        self.face = Some(OpenFace::default());
    }

    /// Add a triangle to the open face
    ///
    /// Degenerate (repeated index), out-of-range and invalid-point triangles
    /// are rejected and never reach the adjacency map.
    pub fn append_triangle(&mut self, a: u32, b: u32, c: u32) -> Result<()> {
        if let Err(e) = self.validate_triangle(a, b, c) {
            log::debug!("{}: rejected triangle: {}", self.name, e);
            self.stats.triangles_rejected += 1;
            return Err(e);
        }
        let Some(face) = self.face.as_mut() else {
            self.stats.triangles_rejected += 1;
            return Err(Error::NoOpenFace);
        };

        let index = face.triangles.len();
        face.triangles.push([a, b, c]);
        for corner in [a, b, c] {
            face.adjacency.entry(corner).or_default().push(index);
        }
        self.stats.triangles_accepted += 1;
        Ok(())
    }

    /// Triangles of the open face touching `point`
    pub fn incident_triangles(&self, point: u32) -> &[usize] {
        self.face
            .as_ref()
            .and_then(|f| f.adjacency.get(&point))
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Number of points registered in the open face's adjacency map
    pub fn adjacency_len(&self) -> usize {
        self.face.as_ref().map_or(0, |f| f.adjacency.len())
    }

    /// Close the open face and walk it into the segment buffer
    pub fn end_face(&mut self) {
        let Some(face) = self.face.take() else {
            return;
        };
        self.stats.faces += 1;
        self.walk_face(face);
    }

    /// Flush what is left and hand the sink back
    pub fn end_meshing(mut self) -> S {
        self.end_face();
        if self.buffer.triangle_count() > 0 {
            self.emit_buffer();
        }
        self.sink
    }

    pub fn stats(&self) -> PartitionStats {
        self.stats
    }

    /// Drain problems found during face walks
    pub fn take_warnings(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.warnings)
    }

    fn validate_triangle(&self, a: u32, b: u32, c: u32) -> Result<()> {
        if a == b || b == c || a == c {
            return Err(Error::DegenerateTriangle(a, b, c));
        }
        for corner in [a, b, c] {
            match self.points.get(corner as usize) {
                None => return Err(Error::index_out_of_range(corner, self.points.len())),
                Some(None) => return Err(Error::InvalidPoint(corner)),
                Some(Some(_)) => {}
            }
        }
        Ok(())
    }

    #[inline]
    fn position(&self, index: u32) -> Point3<f64> {
        // Corners are validated on append
        self.points[index as usize].unwrap_or_else(Point3::origin)
    }

    fn basis_of(&self, corners: [u32; 3]) -> Option<PlanarBasis> {
        PlanarBasis::of_triangle(
            &self.position(corners[0]),
            &self.position(corners[1]),
            &self.position(corners[2]),
        )
    }

    fn warn(&mut self, error: Error) {
        log::debug!("{}: {}", self.name, error);
        self.warnings.push(error);
    }

    fn buffer_vertex(&mut self, source: u32, basis: &PlanarBasis, uv: [f64; 2]) -> u32 {
        let p = self.position(source);
        self.buffer.push(Vertex {
            source,
            position: [p.x as f32, p.y as f32, p.z as f32],
            normal: [
                basis.normal.x as f32,
                basis.normal.y as f32,
                basis.normal.z as f32,
            ],
            uv: [uv[0] as f32, uv[1] as f32],
            tangent: basis.tangent(),
        })
    }

    fn walk_face(&mut self, face: OpenFace) {
        let OpenFace {
            triangles,
            adjacency,
        } = face;
        let ceiling = self.options.ceiling();

        let mut visited = vec![false; triangles.len()];
        // Point index -> vertex in the current buffer
        let mut buffered: FxHashMap<u32, u32> = FxHashMap::default();
        let mut queue: VecDeque<(u32, [f64; 2])> = VecDeque::new();

        for seed_triangle in 0..triangles.len() {
            if visited[seed_triangle] {
                continue;
            }

            let seed = triangles[seed_triangle][0];
            let incident = adjacency.get(&seed).map(|l| l.as_slice()).unwrap_or(&[]);
            let Some(seed_basis) = incident.iter().find_map(|&t| self.basis_of(triangles[t])) else {
                for &t in incident {
                    if !visited[t] {
                        visited[t] = true;
                        let [a, b, c] = triangles[t];
                        self.warn(Error::ZeroAreaTriangle(a, b, c));
                    }
                }
                continue;
            };

            if !buffered.contains_key(&seed) {
                let vertex = self.buffer_vertex(seed, &seed_basis, [0.0, 0.0]);
                buffered.insert(seed, vertex);
            }
            queue.push_back((seed, [0.0, 0.0]));

            while let Some((point, origin)) = queue.pop_front() {
                let Some(incident) = adjacency.get(&point) else {
                    continue;
                };

                for &t in incident.iter() {
                    if visited[t] {
                        continue;
                    }
                    visited[t] = true;

                    let corners = triangles[t];
                    if !corners.contains(&point) {
                        self.warn(Error::NotACorner { point, triangle: t });
                        continue;
                    }
                    let Some(basis) = self.basis_of(corners) else {
                        self.warn(Error::ZeroAreaTriangle(corners[0], corners[1], corners[2]));
                        continue;
                    };

                    let anchor = self.position(point);
                    let mut resolved = [0u32; 3];
                    for (slot, &corner) in corners.iter().enumerate() {
                        resolved[slot] = match buffered.get(&corner) {
                            Some(&vertex) => vertex,
                            None => {
                                let uv = if corner == point {
                                    origin
                                } else {
                                    basis.project(origin, &anchor, &self.position(corner))
                                };
                                let vertex = self.buffer_vertex(corner, &basis, uv);
                                buffered.insert(corner, vertex);
                                if corner != point {
                                    queue.push_back((corner, uv));
                                }
                                vertex
                            }
                        };
                    }

                    self.buffer.indices.extend_from_slice(&resolved);
                    if self.buffer.triangle_count() >= ceiling {
                        self.flush_with_carry_over(&mut buffered);
                    }
                }
            }
        }
    }

    /// Emit the buffer and re-seed it with the last two corners used
    fn flush_with_carry_over(&mut self, buffered: &mut FxHashMap<u32, u32>) {
        let n = self.buffer.indices.len();
        let carried = [
            self.buffer.vertices[self.buffer.indices[n - 2] as usize],
            self.buffer.vertices[self.buffer.indices[n - 1] as usize],
        ];

        self.emit_buffer();

        buffered.clear();
        for vertex in carried {
            let index = self.buffer.push(vertex);
            buffered.insert(vertex.source, index);
        }
    }

    fn emit_buffer(&mut self) {
        let SegmentBuffer { vertices, indices } = std::mem::take(&mut self.buffer);

        let segment = MeshSegment {
            name: format!("{}_{}", self.name, self.stats.segments_emitted),
            positions: vertices.iter().map(|v| v.position).collect(),
            normals: vertices.iter().map(|v| v.normal).collect(),
            uvs: vertices.iter().map(|v| v.uv).collect(),
            tangents: vertices.iter().map(|v| v.tangent).collect(),
            indices,
            cast_shadows: self.options.cast_shadows,
            receive_shadows: self.options.receive_shadows,
            use_light_probes: self.options.use_light_probes,
        };

        self.stats.segments_emitted += 1;
        self.stats.triangles_emitted += segment.triangle_count();
        self.sink.emit(segment);
    }
}
