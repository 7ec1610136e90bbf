// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural callbacks fired by section cursors
//!
//! A [`SectionCursor`](crate::SectionCursor) classifies elements and calls
//! into a [`SectionHandler`]. The scene builder is the main handler;
//! [`ChannelHandler`] forwards owned [`SectionEvent`]s to another thread
//! instead, where [`SectionEvent::dispatch`] replays them.

use crate::SectionKind;
use bimxml_model::Diagnostic;
use std::sync::mpsc::SyncSender;

/// Attributes of the document root element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentInfo {
    pub tag: String,
    pub project_id: Option<String>,
    pub source_file_name: Option<String>,
}

/// Contents of the `metaData` element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataInfo {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A `material` element
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialInfo {
    pub id: String,
    pub name: Option<String>,
    /// 0-255 per channel
    pub rgb: [u8; 3],
    /// 0 = opaque, 1 = fully transparent
    pub transparency: f32,
}

/// A `rootContainer`, `container` or `object3D` element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeInfo {
    pub id: String,
    pub name: Option<String>,
    /// Explicit parent back-reference
    pub ref_id: Option<String>,
    /// Initial classification (`type`)
    pub kind: Option<String>,
    pub material_id: Option<String>,
}

/// A `property` element with its text content
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    pub ref_id: String,
    pub value: String,
    pub operator: Option<String>,
    pub data_type: Option<String>,
}

/// Receiver of cursor callbacks
///
/// Every method defaults to a no-op so handlers only implement what they
/// care about.
#[allow(unused_variables)]
pub trait SectionHandler {
    fn on_document(&mut self, info: &DocumentInfo) {}
    fn on_metadata(&mut self, info: &MetadataInfo) {}
    fn on_section_start(&mut self, kind: SectionKind) {}
    fn on_section_end(&mut self, kind: SectionKind) {}

    fn on_material(&mut self, info: &MaterialInfo) {}

    fn on_container_start(&mut self, info: &NodeInfo) {}
    fn on_container_end(&mut self) {}
    fn on_object(&mut self, info: &NodeInfo) {}

    fn on_geometry_start(&mut self, ref_id: &str) {}
    /// `None` for a point whose coordinates could not be read
    fn on_point(&mut self, point: Option<[f64; 3]>) {}
    fn on_face_start(&mut self) {}
    fn on_triangle(&mut self, corners: [u32; 3]) {}
    fn on_face_end(&mut self) {}
    fn on_geometry_end(&mut self) {}

    fn on_property(&mut self, info: &PropertyInfo) {}

    /// An element was skipped because it could not be read
    fn on_malformed(&mut self, diagnostic: Diagnostic) {}
}

/// Owned form of one handler callback
#[derive(Clone, Debug, PartialEq)]
pub enum SectionEvent {
    Document(DocumentInfo),
    Metadata(MetadataInfo),
    SectionStart(SectionKind),
    SectionEnd(SectionKind),
    Material(MaterialInfo),
    ContainerStart(NodeInfo),
    ContainerEnd,
    Object(NodeInfo),
    GeometryStart(String),
    Point(Option<[f64; 3]>),
    FaceStart,
    Triangle([u32; 3]),
    FaceEnd,
    GeometryEnd,
    Property(PropertyInfo),
    Malformed(Diagnostic),
}

impl SectionEvent {
    /// Replay this event into `handler`
    pub fn dispatch<H: SectionHandler + ?Sized>(self, handler: &mut H) {
        match self {
            SectionEvent::Document(info) => handler.on_document(&info),
            SectionEvent::Metadata(info) => handler.on_metadata(&info),
            SectionEvent::SectionStart(kind) => handler.on_section_start(kind),
            SectionEvent::SectionEnd(kind) => handler.on_section_end(kind),
            SectionEvent::Material(info) => handler.on_material(&info),
            SectionEvent::ContainerStart(info) => handler.on_container_start(&info),
            SectionEvent::ContainerEnd => handler.on_container_end(),
            SectionEvent::Object(info) => handler.on_object(&info),
            SectionEvent::GeometryStart(ref_id) => handler.on_geometry_start(&ref_id),
            SectionEvent::Point(point) => handler.on_point(point),
            SectionEvent::FaceStart => handler.on_face_start(),
            SectionEvent::Triangle(corners) => handler.on_triangle(corners),
            SectionEvent::FaceEnd => handler.on_face_end(),
            SectionEvent::GeometryEnd => handler.on_geometry_end(),
            SectionEvent::Property(info) => handler.on_property(&info),
            SectionEvent::Malformed(diagnostic) => handler.on_malformed(diagnostic),
        }
    }
}

/// Collects events in memory
impl SectionHandler for Vec<SectionEvent> {
    fn on_document(&mut self, info: &DocumentInfo) {
        self.push(SectionEvent::Document(info.clone()));
    }
    fn on_metadata(&mut self, info: &MetadataInfo) {
        self.push(SectionEvent::Metadata(info.clone()));
    }
    fn on_section_start(&mut self, kind: SectionKind) {
        self.push(SectionEvent::SectionStart(kind));
    }
    fn on_section_end(&mut self, kind: SectionKind) {
        self.push(SectionEvent::SectionEnd(kind));
    }
    fn on_material(&mut self, info: &MaterialInfo) {
        self.push(SectionEvent::Material(info.clone()));
    }
    fn on_container_start(&mut self, info: &NodeInfo) {
        self.push(SectionEvent::ContainerStart(info.clone()));
    }
    fn on_container_end(&mut self) {
        self.push(SectionEvent::ContainerEnd);
    }
    fn on_object(&mut self, info: &NodeInfo) {
        self.push(SectionEvent::Object(info.clone()));
    }
    fn on_geometry_start(&mut self, ref_id: &str) {
        self.push(SectionEvent::GeometryStart(ref_id.to_string()));
    }
    fn on_point(&mut self, point: Option<[f64; 3]>) {
        self.push(SectionEvent::Point(point));
    }
    fn on_face_start(&mut self) {
        self.push(SectionEvent::FaceStart);
    }
    fn on_triangle(&mut self, corners: [u32; 3]) {
        self.push(SectionEvent::Triangle(corners));
    }
    fn on_face_end(&mut self) {
        self.push(SectionEvent::FaceEnd);
    }
    fn on_geometry_end(&mut self) {
        self.push(SectionEvent::GeometryEnd);
    }
    fn on_property(&mut self, info: &PropertyInfo) {
        self.push(SectionEvent::Property(info.clone()));
    }
    fn on_malformed(&mut self, diagnostic: Diagnostic) {
        self.push(SectionEvent::Malformed(diagnostic));
    }
}

/// Forwards every callback over a channel
///
/// Used by worker-thread cursors; the receiving side replays the events on
/// the single thread that owns the scene builder. The channel is bounded, so
/// a cursor blocks once its lane is full.
pub struct ChannelHandler {
    sender: SyncSender<SectionEvent>,
    disconnected: bool,
}

impl ChannelHandler {
    pub fn new(sender: SyncSender<SectionEvent>) -> Self {
        Self {
            sender,
            disconnected: false,
        }
    }

    /// The receiver has gone away; further events are dropped
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn send(&mut self, event: SectionEvent) {
        if !self.disconnected && self.sender.send(event).is_err() {
            log::debug!("event receiver dropped");
            self.disconnected = true;
        }
    }
}

impl SectionHandler for ChannelHandler {
    fn on_document(&mut self, info: &DocumentInfo) {
        self.send(SectionEvent::Document(info.clone()));
    }
    fn on_metadata(&mut self, info: &MetadataInfo) {
        self.send(SectionEvent::Metadata(info.clone()));
    }
    fn on_section_start(&mut self, kind: SectionKind) {
        self.send(SectionEvent::SectionStart(kind));
    }
    fn on_section_end(&mut self, kind: SectionKind) {
        self.send(SectionEvent::SectionEnd(kind));
    }
    fn on_material(&mut self, info: &MaterialInfo) {
        self.send(SectionEvent::Material(info.clone()));
    }
    fn on_container_start(&mut self, info: &NodeInfo) {
        self.send(SectionEvent::ContainerStart(info.clone()));
    }
    fn on_container_end(&mut self) {
        self.send(SectionEvent::ContainerEnd);
    }
    fn on_object(&mut self, info: &NodeInfo) {
        self.send(SectionEvent::Object(info.clone()));
    }
    fn on_geometry_start(&mut self, ref_id: &str) {
        self.send(SectionEvent::GeometryStart(ref_id.to_string()));
    }
    fn on_point(&mut self, point: Option<[f64; 3]>) {
        self.send(SectionEvent::Point(point));
    }
    fn on_face_start(&mut self) {
        self.send(SectionEvent::FaceStart);
    }
    fn on_triangle(&mut self, corners: [u32; 3]) {
        self.send(SectionEvent::Triangle(corners));
    }
    fn on_face_end(&mut self) {
        self.send(SectionEvent::FaceEnd);
    }
    fn on_geometry_end(&mut self) {
        self.send(SectionEvent::GeometryEnd);
    }
    fn on_property(&mut self, info: &PropertyInfo) {
        self.send(SectionEvent::Property(info.clone()));
    }
    fn on_malformed(&mut self, diagnostic: Diagnostic) {
        self.send(SectionEvent::Malformed(diagnostic));
    }
}
