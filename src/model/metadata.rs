//! Block comments: plain text or an XML property bag.
//!
//! MDF4 stores comments either as a TX block (plain text) or as an MD block
//! holding XML such as
//!
//! ```xml
//! <CGcomment xmlns="http://www.asam.net/mdf/v4">
//!   <TX>Engine signals</TX>
//!   <common_properties>
//!     <e name="vehicle" type="string">Test car</e>
//!   </common_properties>
//! </CGcomment>
//! ```
//!
//! [`Comment`] splits that into the description (`<TX>`), the `<e>` tags of
//! `<common_properties>` ([`MetaData`]) and any other leaf elements (kept as
//! slash separated paths, e.g. `names/display`).

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::logging::mdf_log;

/// XML data type of an [`ETag`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ETagDataType {
    #[default]
    String,
    Decimal,
    Integer,
    Float,
    Boolean,
    Date,
    Time,
    DateTime,
}

impl ETagDataType {
    pub fn as_xml(&self) -> &'static str {
        match self {
            ETagDataType::String => "string",
            ETagDataType::Decimal => "decimal",
            ETagDataType::Integer => "integer",
            ETagDataType::Float => "float",
            ETagDataType::Boolean => "boolean",
            ETagDataType::Date => "date",
            ETagDataType::Time => "time",
            ETagDataType::DateTime => "dateTime",
        }
    }

    pub fn from_xml(text: &str) -> Self {
        match text {
            "decimal" => ETagDataType::Decimal,
            "integer" => ETagDataType::Integer,
            "float" | "double" => ETagDataType::Float,
            "boolean" => ETagDataType::Boolean,
            "date" => ETagDataType::Date,
            "time" => ETagDataType::Time,
            "dateTime" => ETagDataType::DateTime,
            _ => ETagDataType::String,
        }
    }
}

/// The value of an [`ETag`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ETagValue {
    String(String),
    Float(f64),
    Boolean(bool),
    Signed(i64),
    Unsigned(u64),
}

impl Default for ETagValue {
    fn default() -> Self {
        ETagValue::String(String::new())
    }
}

impl ETagValue {
    fn to_text(&self) -> String {
        match self {
            ETagValue::String(s) => s.clone(),
            ETagValue::Float(v) => format!("{v}"),
            ETagValue::Boolean(v) => v.to_string(),
            ETagValue::Signed(v) => v.to_string(),
            ETagValue::Unsigned(v) => v.to_string(),
        }
    }

    fn parse(text: &str, data_type: ETagDataType) -> Self {
        let text = text.trim();
        match data_type {
            ETagDataType::Float | ETagDataType::Decimal => text
                .parse()
                .map(ETagValue::Float)
                .unwrap_or_else(|_| ETagValue::String(text.to_string())),
            ETagDataType::Integer => text
                .parse::<i64>()
                .map(ETagValue::Signed)
                .or_else(|_| text.parse::<u64>().map(ETagValue::Unsigned))
                .unwrap_or_else(|_| ETagValue::String(text.to_string())),
            ETagDataType::Boolean => match text {
                "true" | "1" => ETagValue::Boolean(true),
                "false" | "0" => ETagValue::Boolean(false),
                other => ETagValue::String(other.to_string()),
            },
            _ => ETagValue::String(text.to_string()),
        }
    }
}

/// One `<e>` property.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ETag {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub unit_ref: String,
    /// Free text type annotation (`type` attribute is the data type).
    pub tag_type: String,
    pub data_type: ETagDataType,
    pub language: String,
    pub read_only: bool,
    pub value: ETagValue,
}

impl ETag {
    pub fn new(name: &str, value: ETagValue) -> Self {
        let data_type = match value {
            ETagValue::String(_) => ETagDataType::String,
            ETagValue::Float(_) => ETagDataType::Float,
            ETagValue::Boolean(_) => ETagDataType::Boolean,
            ETagValue::Signed(_) | ETagValue::Unsigned(_) => ETagDataType::Integer,
        };
        Self {
            name: name.to_string(),
            data_type,
            value,
            ..Default::default()
        }
    }

    pub fn value_as_string(&self) -> String {
        self.value.to_text()
    }

    pub fn value_as_float(&self) -> Option<f64> {
        match &self.value {
            ETagValue::Float(v) => Some(*v),
            ETagValue::Signed(v) => Some(*v as f64),
            ETagValue::Unsigned(v) => Some(*v as f64),
            ETagValue::String(s) => s.trim().parse().ok(),
            ETagValue::Boolean(_) => None,
        }
    }
}

/// Property bag attached to a block comment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaData {
    properties: Vec<ETag>,
    xml_snippet: String,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> &[ETag] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&ETag> {
        self.properties.iter().find(|tag| tag.name == name)
    }

    /// Adds `tag`, replacing an existing tag of the same name.
    pub fn add_property(&mut self, tag: ETag) {
        match self.properties.iter_mut().find(|t| t.name == tag.name) {
            Some(existing) => *existing = tag,
            None => self.properties.push(tag),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<ETag> {
        let pos = self.properties.iter().position(|t| t.name == name)?;
        Some(self.properties.remove(pos))
    }

    pub fn property_as_string(&self, name: &str) -> Option<String> {
        self.property(name).map(ETag::value_as_string)
    }

    pub fn set_property_as_string(&mut self, name: &str, value: &str) {
        self.add_property(ETag::new(name, ETagValue::String(value.to_string())));
    }

    pub fn property_as_float(&self, name: &str) -> Option<f64> {
        self.property(name).and_then(ETag::value_as_float)
    }

    pub fn set_property_as_float(&mut self, name: &str, value: f64) {
        self.add_property(ETag::new(name, ETagValue::Float(value)));
    }

    /// The raw XML the comment was read from, or a caller supplied snippet
    /// written verbatim when the bag has no properties.
    pub fn xml_snippet(&self) -> &str {
        &self.xml_snippet
    }

    pub fn set_xml_snippet(&mut self, xml: &str) {
        self.xml_snippet = xml.to_string();
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.xml_snippet.is_empty()
    }
}

/// Escapes text for XML element content and attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// A block comment split into description, leaf fields and properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Comment {
    pub text: String,
    pub fields: Vec<(String, String)>,
    pub metadata: Option<MetaData>,
}

impl Comment {
    pub fn field(&self, path: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.as_str())
    }

    /// Interprets a TX text (`is_xml == false`) or MD XML payload.
    pub fn parse(content: &str, is_xml: bool) -> Self {
        if !is_xml {
            return Self {
                text: content.to_string(),
                ..Default::default()
            };
        }
        let trimmed = content.trim_end_matches(['\0', '\n', '\r', ' ']);
        let doc = match roxmltree::Document::parse(trimmed) {
            Ok(doc) => doc,
            Err(e) => {
                mdf_log!(Warning, "Comment::parse", "unreadable XML comment: {e}");
                return Self {
                    text: trimmed.to_string(),
                    ..Default::default()
                };
            }
        };

        let mut comment = Comment::default();
        let mut metadata = MetaData::new();
        metadata.set_xml_snippet(trimmed);
        let root = doc.root_element();
        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "TX" => comment.text = child.text().unwrap_or_default().to_string(),
                "common_properties" => {
                    for e in child.descendants().filter(|n| n.has_tag_name("e")) {
                        let data_type = ETagDataType::from_xml(e.attribute("type").unwrap_or(""));
                        metadata.properties.push(ETag {
                            name: e.attribute("name").unwrap_or_default().to_string(),
                            description: e.attribute("desc").unwrap_or_default().to_string(),
                            unit: e.attribute("unit").unwrap_or_default().to_string(),
                            unit_ref: e.attribute("unit_ref").unwrap_or_default().to_string(),
                            tag_type: e.attribute("tag_type").unwrap_or_default().to_string(),
                            data_type,
                            language: e
                                .attribute(("http://www.w3.org/XML/1998/namespace", "lang"))
                                .unwrap_or_default()
                                .to_string(),
                            read_only: e.attribute("ro") == Some("true"),
                            value: ETagValue::parse(e.text().unwrap_or_default(), data_type),
                        });
                    }
                }
                _ => collect_leaves(child, "", &mut comment.fields),
            }
        }
        comment.metadata = Some(metadata);
        comment
    }

    /// Serializes as an MD payload with root element `root` (e.g. "CGcomment").
    pub fn to_xml(&self, root: &str) -> String {
        if let Some(md) = &self.metadata
            && md.properties.is_empty()
            && self.fields.is_empty()
            && self.text.is_empty()
            && !md.xml_snippet.is_empty()
        {
            return md.xml_snippet.clone();
        }

        let mut xml = format!("<{root} xmlns=\"http://www.asam.net/mdf/v4\">");
        xml.push_str(&format!("<TX>{}</TX>", xml_escape(&self.text)));
        let mut open: Option<&str> = None;
        for (path, value) in &self.fields {
            let (parent, leaf) = match path.split_once('/') {
                Some((parent, leaf)) => (Some(parent), leaf),
                None => (None, path.as_str()),
            };
            if open != parent {
                if let Some(p) = open {
                    xml.push_str(&format!("</{p}>"));
                }
                if let Some(p) = parent {
                    xml.push_str(&format!("<{p}>"));
                }
                open = parent;
            }
            xml.push_str(&format!("<{leaf}>{}</{leaf}>", xml_escape(value)));
        }
        if let Some(p) = open {
            xml.push_str(&format!("</{p}>"));
        }
        if let Some(md) = self.metadata.as_ref().filter(|m| !m.properties.is_empty()) {
            xml.push_str("<common_properties>");
            for tag in &md.properties {
                xml.push_str(&format!("<e name=\"{}\"", xml_escape(&tag.name)));
                for (attr, value) in [
                    ("desc", &tag.description),
                    ("unit", &tag.unit),
                    ("unit_ref", &tag.unit_ref),
                    ("tag_type", &tag.tag_type),
                    ("xml:lang", &tag.language),
                ] {
                    if !value.is_empty() {
                        xml.push_str(&format!(" {attr}=\"{}\"", xml_escape(value)));
                    }
                }
                if tag.data_type != ETagDataType::String {
                    xml.push_str(&format!(" type=\"{}\"", tag.data_type.as_xml()));
                }
                if tag.read_only {
                    xml.push_str(" ro=\"true\"");
                }
                xml.push_str(&format!(">{}</e>", xml_escape(&tag.value_as_string())));
            }
            xml.push_str("</common_properties>");
        }
        xml.push_str(&format!("</{root}>"));
        xml
    }

    /// True when the comment can be stored as a plain TX block.
    pub fn is_plain(&self) -> bool {
        self.fields.is_empty() && self.metadata.as_ref().is_none_or(MetaData::is_empty)
    }

    pub fn set_field(&mut self, path: &str, value: &str) {
        match self.fields.iter_mut().find(|(p, _)| p == path) {
            Some((_, v)) => *v = value.to_string(),
            None if !value.is_empty() => self.fields.push((path.to_string(), value.to_string())),
            None => {}
        }
    }
}

fn collect_leaves(node: roxmltree::Node<'_, '_>, prefix: &str, out: &mut Vec<(String, String)>) {
    let name = node.tag_name().name();
    let path = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    };
    let mut has_children = false;
    for child in node.children().filter(|n| n.is_element()) {
        has_children = true;
        collect_leaves(child, &path, out);
    }
    if !has_children && let Some(text) = node.text() {
        out.push((path, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_bag_accessors() {
        let mut md = MetaData::new();
        md.set_property_as_string("author", "Ingrid");
        md.set_property_as_float("gain", 2.5);
        md.set_property_as_string("author", "Kai");
        assert_eq!(md.properties().len(), 2);
        assert_eq!(md.property_as_string("author").as_deref(), Some("Kai"));
        assert_eq!(md.property_as_float("gain"), Some(2.5));
        assert_eq!(md.property_as_float("missing"), None);
    }

    #[test]
    fn xml_round_trip() {
        let mut md = MetaData::new();
        md.set_property_as_string("project", "A & B");
        md.add_property(ETag {
            unit: "km".into(),
            read_only: true,
            ..ETag::new("odometer", ETagValue::Unsigned(120))
        });
        let mut comment = Comment {
            text: "Signals <raw>".into(),
            metadata: Some(md),
            ..Default::default()
        };
        comment.set_field("names/display", "Speed");
        comment.set_field("tool_id", "logger");

        let xml = comment.to_xml("CNcomment");
        let parsed = Comment::parse(&xml, true);
        assert_eq!(parsed.text, "Signals <raw>");
        assert_eq!(parsed.field("names/display"), Some("Speed"));
        assert_eq!(parsed.field("tool_id"), Some("logger"));
        let md = parsed.metadata.unwrap();
        assert_eq!(md.property_as_string("project").as_deref(), Some("A & B"));
        let odo = md.property("odometer").unwrap();
        assert_eq!(odo.value, ETagValue::Signed(120));
        assert_eq!(odo.unit, "km");
        assert!(odo.read_only);
    }

    #[test]
    fn broken_xml_falls_back_to_text() {
        let parsed = Comment::parse("<HDcomment><TX>oops", true);
        assert_eq!(parsed.text, "<HDcomment><TX>oops");
        assert!(parsed.metadata.is_none());
    }

    #[test]
    fn plain_text_comment() {
        let parsed = Comment::parse("just text", false);
        assert!(parsed.is_plain());
        assert_eq!(parsed.text, "just text");
    }
}
