// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Forward-only section cursor
//!
//! A cursor owns its own XML reader over its own stream handle. It seeks
//! past everything that is not one of its target sections (skipping whole
//! subtrees), reads the target sections element by element and fires
//! [`SectionHandler`] callbacks as it crosses element boundaries.
//!
//! ```text
//! Seeking ──<section>──> InSection(kind) ──</section>──> Seeking | Done
//!    └──────────────</root>──────────────────────────────────────> Done
//! ```
//!
//! A cursor that reports the document keeps seeking after its last section
//! until it has seen `metaData` or the root closes, so metadata is picked
//! up wherever it sits.

use crate::handler::{
    DocumentInfo, MaterialInfo, MetadataInfo, NodeInfo, PropertyInfo, SectionHandler,
};
use crate::SectionKind;
use bimxml_model::{Diagnostic, DiagnosticKind, ImportError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use smallvec::SmallVec;
use std::io::BufRead;

const METADATA_TAG: &str = "metaData";

/// Cursor state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// Looking for the next target section start tag
    Seeking,
    InSection(SectionKind),
    /// All target sections (and metadata, if reported) read, or the root
    /// element closed
    Done,
}

/// Owned attribute list of one element
#[derive(Debug, Default)]
struct Attrs(SmallVec<[(String, String); 6]>);

impl Attrs {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Non-blank value
    fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn required(&self, key: &str) -> std::result::Result<String, String> {
        self.text(key)
            .ok_or_else(|| format!("missing attribute '{}'", key))
    }

    fn f64(&self, key: &str) -> std::result::Result<f64, String> {
        let raw = self.required(key)?;
        lexical_core::parse::<f64>(raw.as_bytes())
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid number '{}' in '{}'", raw, key))
    }

    fn u32(&self, key: &str) -> std::result::Result<u32, String> {
        let raw = self.required(key)?;
        lexical_core::parse::<u32>(raw.as_bytes())
            .map_err(|_| format!("invalid index '{}' in '{}'", raw, key))
    }

    /// 0-255 channel; fractional values are rounded, out-of-range clamped
    fn channel(&self, key: &str) -> std::result::Result<u8, String> {
        let value = self.f64(key)?;
        Ok(value.round().clamp(0.0, 255.0) as u8)
    }
}

enum Token {
    Start {
        tag: String,
        attrs: Attrs,
        /// Raw qualified name, for skipping the subtree
        raw_name: Vec<u8>,
    },
    Empty {
        tag: String,
        attrs: Attrs,
    },
    End {
        tag: String,
    },
    Text(String),
    Eof,
    Ignored,
}

/// What to do with an element's content after its start tag
#[derive(Clone, Copy, PartialEq, Eq)]
enum Flow {
    Enter,
    /// Element was rejected; skip its content and fire no end callback
    Skip,
}

/// Forward-only cursor over one stream, serving one or more sections
pub struct SectionCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    state: CursorState,
    /// Target sections not entered yet
    pending: SmallVec<[SectionKind; 4]>,
    /// Fire document and metadata callbacks
    report_document: bool,
    root_seen: bool,
    metadata_seen: bool,
    depth: usize,
    section_depth: usize,
    /// One entry per open container: whether its start callback fired
    containers: Vec<bool>,
    geometry_open: bool,
    face_open: bool,
    property: Option<PropertyInfo>,
}

impl<R: BufRead> SectionCursor<R> {
    /// Cursor that reads every section in document order and reports the
    /// document root
    pub fn new(stream: R) -> Self {
        Self::for_sections(stream, &SectionKind::ALL, true)
    }

    /// Cursor restricted to `targets`
    pub fn for_sections(stream: R, targets: &[SectionKind], report_document: bool) -> Self {
        let mut reader = Reader::from_reader(stream);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(1024),
            state: CursorState::Seeking,
            pending: targets.iter().copied().collect(),
            report_document,
            root_seen: false,
            metadata_seen: false,
            depth: 0,
            section_depth: 0,
            containers: Vec::new(),
            geometry_open: false,
            face_open: false,
            property: None,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    /// Byte offset into the stream
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Read one token and fire the callbacks it implies
    ///
    /// Returns `false` once the cursor is done. Stream-fatal problems
    /// (malformed XML, no root element, truncation) are errors; problems
    /// with one element are reported through
    /// [`on_malformed`](SectionHandler::on_malformed).
    pub fn advance<H: SectionHandler + ?Sized>(&mut self, handler: &mut H) -> Result<bool> {
        if self.state == CursorState::Done {
            return Ok(false);
        }

        let token = self.next_token()?;
        match self.state {
            CursorState::Seeking => self.seek(token, handler)?,
            CursorState::InSection(kind) => self.read_section(kind, token, handler)?,
            CursorState::Done => {}
        }
        Ok(self.state != CursorState::Done)
    }

    /// Advance until done
    pub fn drain<H: SectionHandler + ?Sized>(&mut self, handler: &mut H) -> Result<()> {
        while self.advance(handler)? {}
        Ok(())
    }

    fn xml_error(&self, err: impl std::fmt::Display) -> ImportError {
        ImportError::xml(self.position(), err.to_string())
    }

    fn next_token(&mut self) -> Result<Token> {
        self.buf.clear();
        let position = self.position();
        let event = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => event,
            Err(err) => return Err(ImportError::xml(position, err.to_string())),
        };

        let token = match event {
            Event::Start(e) => Token::Start {
                tag: local_name(&e),
                attrs: read_attributes(&e, position)?,
                raw_name: e.name().as_ref().to_vec(),
            },
            Event::Empty(e) => Token::Empty {
                tag: local_name(&e),
                attrs: read_attributes(&e, position)?,
            },
            Event::End(e) => Token::End {
                tag: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            },
            Event::Text(t) => Token::Text(
                t.unescape()
                    .map_err(|err| ImportError::xml(position, err.to_string()))?
                    .into_owned(),
            ),
            Event::CData(t) => Token::Text(String::from_utf8_lossy(&t).into_owned()),
            Event::Eof => Token::Eof,
            _ => Token::Ignored,
        };
        Ok(token)
    }

    fn skip_subtree(&mut self, raw_name: &[u8]) -> Result<()> {
        self.buf.clear();
        if let Err(err) = self.reader.read_to_end_into(QName(raw_name), &mut self.buf) {
            return Err(self.xml_error(err));
        }
        Ok(())
    }

    fn unexpected_eof(&self) -> ImportError {
        if !self.root_seen {
            return ImportError::MissingRoot;
        }
        match self.state {
            CursorState::InSection(kind) => ImportError::truncated(kind.tag()),
            _ => ImportError::truncated("document"),
        }
    }

    // ------------------------------------------------------------------
    // Seeking
    // ------------------------------------------------------------------

    fn seek<H: SectionHandler + ?Sized>(&mut self, token: Token, handler: &mut H) -> Result<()> {
        match token {
            Token::Start {
                tag,
                attrs,
                raw_name,
            } => {
                if !self.root_seen {
                    self.open_root(tag, &attrs, handler);
                    self.depth = 1;
                } else if let Some(kind) = self.target_at_top_level(&tag) {
                    self.depth += 1;
                    self.enter(kind, handler);
                    if kind == SectionKind::Hierarchy {
                        self.element_start(kind, &tag, &attrs, handler);
                    }
                } else {
                    if self.depth == 1 && tag == METADATA_TAG {
                        self.metadata(&attrs, handler);
                    }
                    self.skip_subtree(&raw_name)?;
                }
            }
            Token::Empty { tag, attrs } => {
                if !self.root_seen {
                    self.open_root(tag, &attrs, handler);
                    self.finish();
                } else if let Some(kind) = self.target_at_top_level(&tag) {
                    self.depth += 1;
                    self.enter(kind, handler);
                    if kind == SectionKind::Hierarchy
                        && self.element_start(kind, &tag, &attrs, handler) == Flow::Enter
                    {
                        self.element_end(kind, &tag, handler);
                    }
                    self.depth -= 1;
                    self.leave(kind, handler);
                } else if self.depth == 1 && tag == METADATA_TAG {
                    self.metadata(&attrs, handler);
                }
            }
            Token::End { .. } => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    self.finish();
                }
            }
            Token::Eof => return Err(self.unexpected_eof()),
            Token::Text(_) | Token::Ignored => {}
        }
        Ok(())
    }

    fn target_at_top_level(&self, tag: &str) -> Option<SectionKind> {
        if self.depth != 1 {
            return None;
        }
        SectionKind::from_tag(tag).filter(|kind| self.pending.contains(kind))
    }

    fn open_root<H: SectionHandler + ?Sized>(&mut self, tag: String, attrs: &Attrs, handler: &mut H) {
        self.root_seen = true;
        if self.report_document {
            handler.on_document(&DocumentInfo {
                tag,
                project_id: attrs.text("projectID"),
                source_file_name: attrs.text("sourceFileName"),
            });
        }
    }

    fn metadata<H: SectionHandler + ?Sized>(&mut self, attrs: &Attrs, handler: &mut H) {
        if !self.report_document || self.metadata_seen {
            return;
        }
        self.metadata_seen = true;
        handler.on_metadata(&MetadataInfo {
            name: attrs.text("name"),
            description: attrs.text("description"),
        });
        if self.state == CursorState::Seeking && !self.wants_more() {
            self.state = CursorState::Done;
        }
    }

    /// Whether anything is left to look for outside the sections
    fn wants_more(&self) -> bool {
        !self.pending.is_empty() || (self.report_document && !self.metadata_seen)
    }

    fn enter<H: SectionHandler + ?Sized>(&mut self, kind: SectionKind, handler: &mut H) {
        log::debug!("entering <{}> at byte {}", kind, self.position());
        self.pending.retain(|k| *k != kind);
        self.state = CursorState::InSection(kind);
        self.section_depth = self.depth;
        handler.on_section_start(kind);
    }

    fn leave<H: SectionHandler + ?Sized>(&mut self, kind: SectionKind, handler: &mut H) {
        log::debug!("leaving <{}> at byte {}", kind, self.position());
        handler.on_section_end(kind);
        self.state = if self.wants_more() {
            CursorState::Seeking
        } else {
            CursorState::Done
        };
    }

    fn finish(&mut self) {
        for kind in &self.pending {
            log::debug!("section <{}> not present", kind);
        }
        self.pending.clear();
        self.state = CursorState::Done;
    }

    // ------------------------------------------------------------------
    // Inside a section
    // ------------------------------------------------------------------

    fn read_section<H: SectionHandler + ?Sized>(
        &mut self,
        kind: SectionKind,
        token: Token,
        handler: &mut H,
    ) -> Result<()> {
        match token {
            Token::Start {
                tag,
                attrs,
                raw_name,
            } => {
                if self.element_start(kind, &tag, &attrs, handler) == Flow::Enter {
                    self.depth += 1;
                } else {
                    self.skip_subtree(&raw_name)?;
                }
            }
            Token::Empty { tag, attrs } => {
                if self.element_start(kind, &tag, &attrs, handler) == Flow::Enter {
                    self.element_end(kind, &tag, handler);
                }
            }
            Token::End { tag } => {
                if self.depth == self.section_depth {
                    if kind == SectionKind::Hierarchy {
                        self.element_end(kind, &tag, handler);
                    }
                    self.depth -= 1;
                    self.leave(kind, handler);
                } else {
                    self.element_end(kind, &tag, handler);
                    self.depth -= 1;
                }
            }
            Token::Text(text) => {
                if let Some(property) = self.property.as_mut() {
                    property.value.push_str(&text);
                }
            }
            Token::Eof => return Err(self.unexpected_eof()),
            Token::Ignored => {}
        }
        Ok(())
    }

    fn malformed<H: SectionHandler + ?Sized>(&self, tag: &str, message: String, handler: &mut H) {
        handler.on_malformed(
            Diagnostic::new(
                DiagnosticKind::Element,
                format!("{} (byte {})", message, self.position()),
            )
            .on_element(tag),
        );
    }

    fn element_start<H: SectionHandler + ?Sized>(
        &mut self,
        kind: SectionKind,
        tag: &str,
        attrs: &Attrs,
        handler: &mut H,
    ) -> Flow {
        match (kind, tag) {
            (SectionKind::Materials, "material") => {
                match read_material(attrs) {
                    Ok(info) => handler.on_material(&info),
                    Err(message) => self.malformed(tag, message, handler),
                }
                Flow::Enter
            }

            (SectionKind::Hierarchy, "rootContainer" | "container") => {
                match read_node(attrs) {
                    Ok(info) => {
                        handler.on_container_start(&info);
                        self.containers.push(true);
                    }
                    Err(message) => {
                        self.malformed(tag, message, handler);
                        self.containers.push(false);
                    }
                }
                Flow::Enter
            }
            (SectionKind::Hierarchy, "object3D") => {
                match read_node(attrs) {
                    Ok(info) => handler.on_object(&info),
                    Err(message) => self.malformed(tag, message, handler),
                }
                Flow::Enter
            }

            (SectionKind::GeometryData, "data3D") => match attrs.required("refID") {
                Ok(ref_id) => {
                    if self.geometry_open {
                        self.close_geometry(handler);
                    }
                    handler.on_geometry_start(&ref_id);
                    self.geometry_open = true;
                    Flow::Enter
                }
                Err(message) => {
                    self.malformed(tag, message, handler);
                    Flow::Skip
                }
            },
            (SectionKind::GeometryData, "p") => {
                if !self.geometry_open {
                    self.malformed(tag, "point outside data3D".into(), handler);
                    return Flow::Skip;
                }
                match (attrs.f64("x"), attrs.f64("y"), attrs.f64("z")) {
                    (Ok(x), Ok(y), Ok(z)) => handler.on_point(Some([x, y, z])),
                    (Err(message), _, _) | (_, Err(message), _) | (_, _, Err(message)) => {
                        // Keep later indices aligned
                        handler.on_point(None);
                        self.malformed(tag, message, handler);
                    }
                }
                Flow::Enter
            }
            (SectionKind::GeometryData, "face") => {
                if !self.geometry_open {
                    self.malformed(tag, "face outside data3D".into(), handler);
                    return Flow::Skip;
                }
                if self.face_open {
                    handler.on_face_end();
                }
                handler.on_face_start();
                self.face_open = true;
                Flow::Enter
            }
            (SectionKind::GeometryData, "t") => {
                if !self.face_open {
                    self.malformed(tag, "triangle outside face".into(), handler);
                    return Flow::Skip;
                }
                match (attrs.u32("p1"), attrs.u32("p2"), attrs.u32("p3")) {
                    (Ok(a), Ok(b), Ok(c)) => handler.on_triangle([a, b, c]),
                    (Err(message), _, _) | (_, Err(message), _) | (_, _, Err(message)) => {
                        self.malformed(tag, message, handler)
                    }
                }
                Flow::Enter
            }

            (SectionKind::Properties, "property") => {
                match (attrs.required("name"), attrs.required("refID")) {
                    (Ok(name), Ok(ref_id)) => {
                        self.property = Some(PropertyInfo {
                            name,
                            ref_id,
                            value: String::new(),
                            operator: attrs.text("operator"),
                            data_type: attrs.text("dataType"),
                        });
                        Flow::Enter
                    }
                    (Err(message), _) | (_, Err(message)) => {
                        self.malformed(tag, message, handler);
                        Flow::Skip
                    }
                }
            }

            _ => {
                log::trace!("ignoring <{}> in <{}>", tag, kind);
                Flow::Enter
            }
        }
    }

    fn element_end<H: SectionHandler + ?Sized>(&mut self, kind: SectionKind, tag: &str, handler: &mut H) {
        match (kind, tag) {
            (SectionKind::Hierarchy, "rootContainer" | "container") => {
                if self.containers.pop() == Some(true) {
                    handler.on_container_end();
                }
            }
            (SectionKind::GeometryData, "data3D") => self.close_geometry(handler),
            (SectionKind::GeometryData, "face") => {
                if self.face_open {
                    handler.on_face_end();
                    self.face_open = false;
                }
            }
            (SectionKind::Properties, "property") => {
                if let Some(property) = self.property.take() {
                    handler.on_property(&property);
                }
            }
            _ => {}
        }
    }

    fn close_geometry<H: SectionHandler + ?Sized>(&mut self, handler: &mut H) {
        if self.face_open {
            handler.on_face_end();
            self.face_open = false;
        }
        if self.geometry_open {
            handler.on_geometry_end();
            self.geometry_open = false;
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn read_attributes(e: &BytesStart<'_>, position: u64) -> Result<Attrs> {
    let mut attrs = Attrs::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ImportError::xml(position, err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ImportError::xml(position, err.to_string()))?
            .into_owned();
        attrs.0.push((key, value));
    }
    Ok(attrs)
}

fn read_node(attrs: &Attrs) -> std::result::Result<NodeInfo, String> {
    Ok(NodeInfo {
        id: attrs.required("ID")?,
        name: attrs.text("name"),
        ref_id: attrs.text("refID"),
        kind: attrs.text("type"),
        material_id: attrs.text("materialID"),
    })
}

fn read_material(attrs: &Attrs) -> std::result::Result<MaterialInfo, String> {
    let id = attrs.required("ID")?;
    let rgb = [
        attrs.channel("red")?,
        attrs.channel("green")?,
        attrs.channel("blue")?,
    ];
    let transparency = match attrs.get("transparency") {
        Some(_) => attrs.f64("transparency")? as f32,
        None => 0.0,
    };

    Ok(MaterialInfo {
        name: attrs.text("name"),
        id,
        rgb,
        transparency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::SectionEvent;
    use std::io::Cursor;

    fn events(xml: &str, targets: &[SectionKind], report: bool) -> Result<Vec<SectionEvent>> {
        let mut cursor = SectionCursor::for_sections(Cursor::new(xml.as_bytes()), targets, report);
        let mut events = Vec::new();
        cursor.drain(&mut events)?;
        Ok(events)
    }

    const DOC: &str = r#"<?xml version="1.0"?>
<bimxml projectID="P1" sourceFileName="house.ifc">
  <metaData name="House" description="Two rooms"/>
  <propertySection>
    <property name="FireRating" refID="o1">REI 60</property>
  </propertySection>
  <rootContainer ID="c0" name="Site">
    <object3D ID="o1" name="Wall" type="wall"/>
  </rootContainer>
  <objectDataSection>
    <data3D refID="o1">
      <p x="0" y="0" z="0"/><p x="1" y="0" z="0"/><p x="0" y="1" z="0"/>
      <face><t p1="0" p2="1" p3="2"/></face>
    </data3D>
  </objectDataSection>
  <materialSection>
    <material ID="m1" name="Brick" red="255" green="0" blue="0" transparency="0.25"/>
  </materialSection>
</bimxml>"#;

    #[test]
    fn test_single_cursor_document_order() {
        let events = events(DOC, &SectionKind::ALL, true).unwrap();
        assert!(matches!(&events[0], SectionEvent::Document(d) if d.project_id.as_deref() == Some("P1")));
        assert!(matches!(&events[1], SectionEvent::Metadata(m) if m.name.as_deref() == Some("House")));
        assert_eq!(events[2], SectionEvent::SectionStart(SectionKind::Properties));

        let starts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SectionEvent::SectionStart(kind) => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            starts,
            vec![
                SectionKind::Properties,
                SectionKind::Hierarchy,
                SectionKind::GeometryData,
                SectionKind::Materials,
            ]
        );
    }

    #[test]
    fn test_property_text_is_collected() {
        let events = events(DOC, &[SectionKind::Properties], false).unwrap();
        assert_eq!(
            events,
            vec![
                SectionEvent::SectionStart(SectionKind::Properties),
                SectionEvent::Property(PropertyInfo {
                    name: "FireRating".into(),
                    ref_id: "o1".into(),
                    value: "REI 60".into(),
                    operator: None,
                    data_type: None,
                }),
                SectionEvent::SectionEnd(SectionKind::Properties),
            ]
        );
    }

    #[test]
    fn test_hierarchy_cursor_skips_other_sections() {
        let events = events(DOC, &[SectionKind::Hierarchy], true).unwrap();
        assert!(events
            .iter()
            .all(|e| !matches!(e, SectionEvent::Property(_) | SectionEvent::Point(_))));
        assert!(events.contains(&SectionEvent::ContainerEnd));
        assert!(events.iter().any(|e| matches!(
            e,
            SectionEvent::Object(n) if n.id == "o1" && n.kind.as_deref() == Some("wall")
        )));
    }

    #[test]
    fn test_geometry_events() {
        let events = events(DOC, &[SectionKind::GeometryData], false).unwrap();
        assert_eq!(
            events,
            vec![
                SectionEvent::SectionStart(SectionKind::GeometryData),
                SectionEvent::GeometryStart("o1".into()),
                SectionEvent::Point(Some([0.0, 0.0, 0.0])),
                SectionEvent::Point(Some([1.0, 0.0, 0.0])),
                SectionEvent::Point(Some([0.0, 1.0, 0.0])),
                SectionEvent::FaceStart,
                SectionEvent::Triangle([0, 1, 2]),
                SectionEvent::FaceEnd,
                SectionEvent::GeometryEnd,
                SectionEvent::SectionEnd(SectionKind::GeometryData),
            ]
        );
    }

    #[test]
    fn test_material_channels() {
        let events = events(DOC, &[SectionKind::Materials], false).unwrap();
        assert!(events.contains(&SectionEvent::Material(MaterialInfo {
            id: "m1".into(),
            name: Some("Brick".into()),
            rgb: [255, 0, 0],
            transparency: 0.25,
        })));
    }

    #[test]
    fn test_missing_id_is_element_local() {
        let xml = r#"<doc projectID="p">
            <rootContainer ID="root">
              <object3D name="no id"/>
              <object3D ID="ok"/>
            </rootContainer>
          </doc>"#;
        let events = events(xml, &SectionKind::ALL, true).unwrap();
        let malformed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SectionEvent::Malformed(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].element.as_deref(), Some("object3D"));
        assert!(events
            .iter()
            .any(|e| matches!(e, SectionEvent::Object(n) if n.id == "ok")));
    }

    #[test]
    fn test_bad_point_keeps_index_slot() {
        let xml = r#"<doc projectID="p"><objectDataSection>
            <data3D refID="a"><p x="0" y="oops" z="0"/><p x="1" y="1" z="1"/></data3D>
          </objectDataSection></doc>"#;
        let events = events(xml, &[SectionKind::GeometryData], false).unwrap();
        let points: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SectionEvent::Point(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(points, vec![None, Some([1.0, 1.0, 1.0])]);
    }

    #[test]
    fn test_data3d_without_ref_is_skipped() {
        let xml = r#"<doc projectID="p"><objectDataSection>
            <data3D><p x="0" y="0" z="0"/><face><t p1="0" p2="1" p3="2"/></face></data3D>
          </objectDataSection></doc>"#;
        let events = events(xml, &[SectionKind::GeometryData], false).unwrap();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SectionEvent::Point(_) | SectionEvent::Triangle(_))));
        assert!(events
            .iter()
            .any(|e| matches!(e, SectionEvent::Malformed(_))));
    }

    #[test]
    fn test_missing_section_ends_cleanly() {
        let xml = r#"<doc projectID="p"><rootContainer ID="r"/></doc>"#;
        let events = events(xml, &[SectionKind::Properties], false).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_empty_root_container() {
        let xml = r#"<doc projectID="p"><rootContainer ID="r"/></doc>"#;
        let events = events(xml, &[SectionKind::Hierarchy], false).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[1], SectionEvent::ContainerStart(n) if n.id == "r"));
        assert_eq!(events[2], SectionEvent::ContainerEnd);
    }

    #[test]
    fn test_no_root_is_fatal() {
        let err = events("", &SectionKind::ALL, true).unwrap_err();
        assert!(matches!(err, ImportError::MissingRoot));
    }

    #[test]
    fn test_truncated_section_is_fatal() {
        let xml = r#"<doc projectID="p"><objectDataSection><data3D refID="a"><p x="0" y="0" z="0"/>"#;
        assert!(events(xml, &[SectionKind::GeometryData], false).is_err());
    }

    #[test]
    fn test_advance_reports_completion() {
        let xml = r#"<doc projectID="p"><materialSection/></doc>"#;
        let mut cursor =
            SectionCursor::for_sections(Cursor::new(xml.as_bytes()), &[SectionKind::Materials], false);
        let mut sink: Vec<SectionEvent> = Vec::new();
        let mut steps = 0;
        while cursor.advance(&mut sink).unwrap() {
            steps += 1;
        }
        assert!(cursor.is_done());
        assert_eq!(steps, 1);
        assert!(!cursor.advance(&mut sink).unwrap());
    }

    fn metadata_names(events: &[SectionEvent]) -> Vec<Option<String>> {
        events
            .iter()
            .filter_map(|e| match e {
                SectionEvent::Metadata(m) => Some(m.name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_metadata_after_last_section() {
        let xml = r#"<doc projectID="p">
            <rootContainer ID="r"><object3D ID="o"/></rootContainer>
            <propertySection/>
            <metaData name="Late"/>
          </doc>"#;
        let hierarchy = events(xml, &[SectionKind::Hierarchy], true).unwrap();
        assert_eq!(metadata_names(&hierarchy), vec![Some("Late".to_string())]);

        let all = events(xml, &SectionKind::ALL, true).unwrap();
        assert_eq!(metadata_names(&all), vec![Some("Late".to_string())]);
    }

    #[test]
    fn test_first_metadata_wins() {
        let xml = r#"<doc projectID="p">
            <metaData name="First"/>
            <rootContainer ID="r"/>
            <metaData name="Second"><extra/></metaData>
          </doc>"#;
        let events = events(xml, &SectionKind::ALL, true).unwrap();
        assert_eq!(metadata_names(&events), vec![Some("First".to_string())]);
    }

    #[test]
    fn test_reporting_cursor_stops_after_late_metadata() {
        let xml = r#"<doc projectID="p"><rootContainer ID="r"/><metaData name="M"/><materialSection/></doc>"#;
        let mut cursor =
            SectionCursor::for_sections(Cursor::new(xml.as_bytes()), &[SectionKind::Hierarchy], true);
        let mut sink: Vec<SectionEvent> = Vec::new();
        cursor.drain(&mut sink).unwrap();
        assert!(cursor.is_done());
        assert!(matches!(sink.last(), Some(SectionEvent::Metadata(_))));
    }

    #[test]
    fn test_silent_cursor_ignores_late_metadata() {
        let xml = r#"<doc projectID="p"><rootContainer ID="r"/><metaData name="M"/></doc>"#;
        let events = events(xml, &[SectionKind::Hierarchy], false).unwrap();
        assert!(metadata_names(&events).is_empty());
        assert_eq!(events.last(), Some(&SectionEvent::SectionEnd(SectionKind::Hierarchy)));
    }
}
