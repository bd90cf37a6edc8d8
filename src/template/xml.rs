//! XML template parsing.
//!
//! Uses the quick-xml event reader rather than serde so that comments keep
//! their position between fields.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use super::{
    BarcodeSpec, DEFAULT_BASE_FONT, FieldSpec, Group, Item, LabelTemplate, normalize_whitespace,
    parse_f64,
};
use crate::envelope::{DEFAULT_BARCODE_TYPE, Units};
use crate::error::{EtiketError, Result};

type Attrs = HashMap<String, String>;

/// `<Meta>` children we read.
#[derive(Default)]
struct Meta {
    version: Option<String>,
    author: Option<String>,
    date: Option<String>,
    description: Option<String>,
    dpi_reference: Option<String>,
}

impl Meta {
    fn slot(&mut self, tag: &str) -> Option<&mut Option<String>> {
        match tag {
            "Version" => Some(&mut self.version),
            "Author" => Some(&mut self.author),
            "Date" => Some(&mut self.date),
            "Description" => Some(&mut self.description),
            "DpiReference" => Some(&mut self.dpi_reference),
            _ => None,
        }
    }

    fn dpi(&self) -> Option<f64> {
        let raw = self.dpi_reference.as_deref()?;
        match raw.trim().parse::<f64>() {
            Ok(dpi) if dpi.is_finite() => Some(dpi),
            _ => {
                warn!(value = raw, "Ignoring unparsable DpiReference");
                None
            }
        }
    }

    /// `version V by A (D) -- description`
    fn description(&self) -> String {
        let norm = |field: &Option<String>| normalize_whitespace(field.as_deref().unwrap_or(""));

        let mut header_bits = Vec::new();
        let version = norm(&self.version);
        if !version.is_empty() {
            header_bits.push(format!("version {version}"));
        }
        let author = norm(&self.author);
        if !author.is_empty() {
            header_bits.push(format!("by {author}"));
        }
        let date = norm(&self.date);
        if !date.is_empty() {
            header_bits.push(format!("({date})"));
        }

        let mut parts = Vec::new();
        let header = header_bits.join(" ");
        if !header.is_empty() {
            parts.push(header);
        }
        let desc = norm(&self.description);
        if !desc.is_empty() {
            parts.push(desc);
        }
        parts.join(" -- ")
    }
}

/// Where the reader currently is in the document.
enum Scope {
    Root,
    Meta,
    MetaField(String),
    Group,
    Other,
}

pub(super) fn parse_template(xml: &str, source: &str) -> Result<LabelTemplate> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());

    let mut root: Option<Attrs> = None;
    let mut meta = Meta::default();
    let mut groups: Vec<Group> = Vec::new();
    let mut stack: Vec<Scope> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            EtiketError::Template(format!(
                "{}: XML error at byte {}: {}",
                source,
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();

                let scope = match stack.last() {
                    None if root.is_none() => {
                        root = Some(read_attrs(e, source)?);
                        Scope::Root
                    }
                    None => Scope::Other,
                    Some(Scope::Root) => match tag.as_str() {
                        "Meta" => Scope::Meta,
                        "Group" => {
                            let attrs = read_attrs(e, source)?;
                            groups.push(read_group(&attrs));
                            Scope::Group
                        }
                        _ => Scope::Other,
                    },
                    Some(Scope::Meta) => Scope::MetaField(tag.clone()),
                    Some(Scope::Group) => {
                        let attrs = read_attrs(e, source)?;
                        let item = match tag.to_ascii_lowercase().as_str() {
                            "field" => Some(Item::Field(read_field(&attrs))),
                            "barcode" => Some(Item::Barcode(read_barcode(&attrs))),
                            _ => None,
                        };
                        if let (Some(item), Some(group)) = (item, groups.last_mut()) {
                            group.items.push(item);
                        }
                        Scope::Other
                    }
                    Some(_) => Scope::Other,
                };

                if !is_empty {
                    stack.push(scope);
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(ref t) => {
                if let Some(Scope::MetaField(tag)) = stack.last() {
                    let text = t.unescape().map_err(|e| {
                        EtiketError::Template(format!("{}: bad text in <{}>: {}", source, tag, e))
                    })?;
                    if let Some(slot) = meta.slot(tag) {
                        slot.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            Event::CData(ref t) => {
                if let Some(Scope::MetaField(tag)) = stack.last() {
                    if let Some(slot) = meta.slot(tag) {
                        slot.get_or_insert_with(String::new)
                            .push_str(&String::from_utf8_lossy(t));
                    }
                }
            }
            Event::Comment(ref c) => {
                if let (Some(Scope::Group), Some(group)) = (stack.last(), groups.last_mut()) {
                    let text = normalize_whitespace(&String::from_utf8_lossy(c));
                    if !text.is_empty() {
                        group.items.push(Item::Comment(text));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let root = root.ok_or_else(|| EtiketError::Template(format!("{}: no root element", source)))?;
    let get = |key: &str| root.get(key).map(String::as_str);

    let units = match get("units") {
        None => Units::Mm,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(source, units = raw, "Unknown template units, assuming mm");
            Units::Mm
        }),
    };

    let template = LabelTemplate {
        source: source.to_string(),
        label_name: get("name").map(str::to_string).unwrap_or(stem),
        width: parse_f64(get("width"), 0.0),
        height: parse_f64(get("height"), 0.0),
        units,
        base_font: get("baseFont").unwrap_or(DEFAULT_BASE_FONT).to_string(),
        dpi: meta.dpi(),
        description: meta.description(),
        groups,
    };

    debug!(
        source,
        label = %template.label_name,
        groups = template.groups.len(),
        elements = template.element_count(),
        "Parsed label template"
    );

    Ok(template)
}

fn read_attrs(e: &BytesStart<'_>, source: &str) -> Result<Attrs> {
    let mut attrs = Attrs::new();
    for attr in e.attributes() {
        let attr = attr
            .map_err(|err| EtiketError::Template(format!("{}: bad attribute: {}", source, err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| EtiketError::Template(format!("{}: bad attribute {}: {}", source, key, err)))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// First non-empty attribute among `keys`.
fn first_non_empty<'a>(attrs: &'a Attrs, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| attrs.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

fn read_group(attrs: &Attrs) -> Group {
    Group {
        name: attrs.get("name").cloned(),
        offset_x: parse_f64(first_non_empty(attrs, &["offsetX", "offsetx"]), 0.0),
        offset_y: parse_f64(first_non_empty(attrs, &["offsetY", "offsety"]), 0.0),
        items: Vec::new(),
    }
}

fn read_field(attrs: &Attrs) -> FieldSpec {
    FieldSpec {
        x: parse_f64(attrs.get("x").map(String::as_str), 0.0),
        y: parse_f64(attrs.get("y").map(String::as_str), 0.0),
        text: attrs.get("text").cloned(),
        name: attrs.get("name").cloned(),
        prefix: attrs.get("prefix").cloned().unwrap_or_default(),
        suffix: attrs.get("suffix").cloned().unwrap_or_default(),
        font: first_non_empty(attrs, &["font"]).map(str::to_string),
        size: attrs.get("size").cloned(),
        align: attrs.get("align").cloned(),
        direction: attrs.get("dir").cloned(),
    }
}

fn read_barcode(attrs: &Attrs) -> BarcodeSpec {
    let num = |key: &str, default: f64| parse_f64(attrs.get(key).map(String::as_str), default);

    BarcodeSpec {
        x: num("x", 0.0),
        y: num("y", 0.0),
        name: attrs.get("name").cloned(),
        value: attrs.get("value").cloned().unwrap_or_default(),
        kind: attrs
            .get("type")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BARCODE_TYPE.to_string()),
        width: num("width", 1.0) as i64,
        ratio: num("ratio", 1.0) as i64,
        height: num("height", 1.0) as i64,
        size: num("size", 100.0) as i64,
        align: attrs.get("align").cloned(),
        direction: attrs.get("dir").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LabelTemplate name="VIAL_BOX" width="80" height="60" units="mm" baseFont="Swiss 721 BT">
  <Meta>
    <Version>4</Version>
    <Author>  Lab   Team </Author>
    <Date>2024-05-01</Date>
    <Description>Scleral lens
      vial box</Description>
    <DpiReference>203</DpiReference>
  </Meta>
  <Group name="right" offsetX="10" offsety="5">
    <!--   right   lens   -->
    <Field x="1" y="2" name="NAAM" size="8" align="5" dir="1"/>
    <Field x="3" y="4" text="EXP {DATUM}"/>
    <Unknown x="9"/>
    <Barcode x="5" y="6" name="UDI" value="FALLBACK" width="2.7" height="abc"/>
  </Group>
  <!-- not inside a group -->
  <Group>
    <field x="oops" y="1" prefix="[" suffix="]" name="BONNR" font=""/>
  </Group>
</LabelTemplate>"#;

    #[test]
    fn test_parse_root_attributes() {
        let t = parse_template(SAMPLE, "vial.xml").unwrap();
        assert_eq!(t.label_name, "VIAL_BOX");
        assert_eq!(t.source, "vial.xml");
        assert_eq!((t.width, t.height), (80.0, 60.0));
        assert_eq!(t.units, Units::Mm);
        assert_eq!(t.base_font, "Swiss 721 BT");
        assert_eq!(t.dpi, Some(203.0));
    }

    #[test]
    fn test_parse_meta_description() {
        let t = parse_template(SAMPLE, "vial.xml").unwrap();
        assert_eq!(
            t.description,
            "version 4 by Lab Team (2024-05-01) -- Scleral lens vial box"
        );
    }

    #[test]
    fn test_parse_groups_and_items_in_order() {
        let t = parse_template(SAMPLE, "vial.xml").unwrap();
        assert_eq!(t.groups.len(), 2);

        let right = &t.groups[0];
        assert_eq!(right.name.as_deref(), Some("right"));
        assert_eq!((right.offset_x, right.offset_y), (10.0, 5.0));
        assert_eq!(right.items.len(), 4);
        assert_eq!(right.items[0], Item::Comment("right lens".into()));

        match &right.items[1] {
            Item::Field(f) => {
                assert_eq!(f.name.as_deref(), Some("NAAM"));
                assert_eq!(f.size.as_deref(), Some("8"));
                assert_eq!(f.align.as_deref(), Some("5"));
                assert_eq!(f.direction.as_deref(), Some("1"));
                assert_eq!(f.font, None);
            }
            other => panic!("expected field, got {:?}", other),
        }

        match &right.items[3] {
            Item::Barcode(b) => {
                assert_eq!(b.value, "FALLBACK");
                assert_eq!(b.kind, "DATAMATRIX");
                assert_eq!(b.width, 2);
                assert_eq!(b.height, 1);
                assert_eq!(b.size, 100);
            }
            other => panic!("expected barcode, got {:?}", other),
        }
    }

    #[test]
    fn test_lowercase_tags_and_malformed_numbers() {
        let t = parse_template(SAMPLE, "vial.xml").unwrap();
        let second = &t.groups[1];
        assert_eq!((second.offset_x, second.offset_y), (0.0, 0.0));
        match &second.items[0] {
            Item::Field(f) => {
                assert_eq!(f.x, 0.0);
                assert_eq!(f.prefix, "[");
                assert_eq!(f.suffix, "]");
                assert_eq!(f.font, None);
            }
            other => panic!("expected field, got {:?}", other),
        }
    }

    #[test]
    fn test_root_defaults() {
        let t = parse_template("<LabelTemplate/>", "plain.xml").unwrap();
        assert_eq!(t.label_name, "plain");
        assert_eq!((t.width, t.height), (0.0, 0.0));
        assert_eq!(t.base_font, DEFAULT_BASE_FONT);
        assert_eq!(t.dpi, None);
        assert_eq!(t.description, "");
        assert!(t.groups.is_empty());
    }

    #[test]
    fn test_unknown_units_fall_back_to_mm() {
        let t = parse_template(r#"<LabelTemplate units="furlongs"/>"#, "x.xml").unwrap();
        assert_eq!(t.units, Units::Mm);
    }

    #[test]
    fn test_broken_xml_is_an_error() {
        let err = parse_template("<LabelTemplate><Group></LabelTemplate>", "bad.xml").unwrap_err();
        assert!(matches!(err, EtiketError::Template(_)));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(parse_template("", "empty.xml").is_err());
    }
}
