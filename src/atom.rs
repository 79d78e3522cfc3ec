//! Atom syndication feed model carrying the CAP alert extension fields.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{search, NamedValue, TimeStr};

/// Namespace of an Atom `<feed>` root element.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Root structure of an Atom feed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    /// Permanent, universally unique identifier of the feed.
    pub id: String,
    pub title: Text,
    /// Last time the feed was modified in a significant way.
    pub updated: TimeStr,
    /// At least one author, unless every entry names its own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<Person>,
    #[serde(default, skip_serializing_if = "Generator::is_empty")]
    pub generator: Generator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,
    #[serde(default, skip_serializing_if = "Text::is_empty")]
    pub rights: Text,
    #[serde(default, skip_serializing_if = "Text::is_empty")]
    pub subtitle: Text,
    #[serde(rename = "entry", default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Entry>,
}

/// Text construct: chardata with an optional `type` attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$text", default)]
    pub content: String,
}

impl Text {
    /// Untyped plain-text content.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: None,
            content: content.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.content.is_empty()
    }
}

/// A person, corporation, or similar entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Reference to a related web resource; attributes only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// URI of the referenced resource.
    #[serde(rename = "@href")]
    pub href: String,
    /// Link relationship, e.g. `self`, `alternate`, `related`.
    #[serde(rename = "@rel", default, skip_serializing_if = "String::is_empty")]
    pub rel: String,
    /// Media type of the resource.
    #[serde(rename = "@type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "@hreflang", default, skip_serializing_if = "String::is_empty")]
    pub hreflang: String,
    #[serde(rename = "@title", default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "@length", default, skip_serializing_if = "String::is_empty")]
    pub length: String,
}

/// Category of a feed or entry. Alert feeds put the code in the element
/// content rather than the `term` attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "@term", default)]
    pub term: String,
    #[serde(rename = "@scheme", default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    #[serde(rename = "@label", default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

/// Software that generated the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    #[serde(rename = "@uri", default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(rename = "@version", default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

impl Generator {
    pub fn is_empty(&self) -> bool {
        self.uri.is_empty() && self.version.is_empty() && self.content.is_empty()
    }
}

/// One feed entry, projected from a single alert. Upstream feeds spell the
/// alert extension elements with a `cap:` prefix; both spellings parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Identifier of the entry, taken from the alert identifier.
    pub id: String,
    pub title: Text,
    pub updated: TimeStr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Text>,
    /// Retrievable URL back to the stored alert document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<Link>,
    /// Short summary or excerpt of the entry.
    #[serde(default)]
    pub summary: Text,
    #[serde(default, alias = "cap:category", skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<Person>,
    #[serde(default, skip_serializing_if = "TimeStr::is_empty")]
    pub published: TimeStr,
    #[serde(default, skip_serializing_if = "Text::is_empty")]
    pub rights: Text,
    /// Provenance metadata when the entry is copied from another feed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<Source>,

    #[serde(default, alias = "cap:event", skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, alias = "cap:effective", skip_serializing_if = "TimeStr::is_empty")]
    pub effective: TimeStr,
    #[serde(default, alias = "cap:expires", skip_serializing_if = "TimeStr::is_empty")]
    pub expires: TimeStr,
    #[serde(default, alias = "cap:status", skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, alias = "cap:msgType", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(default, alias = "cap:urgency", skip_serializing_if = "String::is_empty")]
    pub urgency: String,
    #[serde(default, alias = "cap:severity", skip_serializing_if = "String::is_empty")]
    pub severity: String,
    #[serde(default, alias = "cap:certainty", skip_serializing_if = "String::is_empty")]
    pub certainty: String,
    /// Joined description of every contributing area.
    #[serde(default, alias = "cap:areaDesc", skip_serializing_if = "String::is_empty")]
    pub area_desc: String,
    #[serde(default, alias = "cap:polygon", skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<String>,
    #[serde(default, alias = "cap:circle", skip_serializing_if = "Vec::is_empty")]
    pub circle: Vec<String>,
    /// Aggregated geographic codes of every contributing area.
    #[serde(default, alias = "cap:geocode")]
    pub geocode: Geocode,
    #[serde(default, alias = "cap:parameter", skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<NamedValue>,
}

impl Entry {
    /// Value of the first parameter named `name`, or `""`.
    pub fn parameter_value(&self, name: &str) -> &str {
        search(&self.parameter, name)
    }
}

/// Metadata from the source feed for entries that are a copy: a reduced
/// feed-shaped record without entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub updated: TimeStr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<Person>,
    #[serde(default, skip_serializing_if = "Generator::is_empty")]
    pub generator: Generator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,
    #[serde(default, skip_serializing_if = "Text::is_empty")]
    pub rights: Text,
    #[serde(default, skip_serializing_if = "Text::is_empty")]
    pub subtitle: Text,
}

/// Geographic codes as two position-paired arrays. This mirrors the wire
/// shape used by alert feeds: repeated `<valueName>`/`<value>` pairs inside
/// one `<geocode>` element. A name may repeat; a value string may carry
/// several space-separated codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GeocodeWire", into = "GeocodeWire")]
pub struct Geocode {
    pub names: Vec<String>,
    pub values: Vec<String>,
}

impl Geocode {
    /// Codes recorded under the first `valueName` equal to `name`, split on
    /// single spaces. Later same-named entries are not consulted; an unknown
    /// name yields an empty sequence.
    pub fn values_for(&self, name: &str) -> Vec<String> {
        for (i, n) in self.names.iter().enumerate() {
            if n == name {
                return match self.values.get(i) {
                    Some(v) => v.split(' ').map(str::to_string).collect(),
                    None => Vec::new(),
                };
            }
        }
        Vec::new()
    }

    /// Append one name/value pair at the same index in both arrays.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.names.push(name.into());
        self.values.push(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }
}

/// Children of a `<geocode>` block in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum GeocodeField {
    #[serde(rename = "valueName")]
    Name(String),
    #[serde(rename = "value")]
    Value(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeocodeWire {
    #[serde(rename = "$value", default)]
    fields: Vec<GeocodeField>,
}

impl From<GeocodeWire> for Geocode {
    fn from(wire: GeocodeWire) -> Self {
        let mut geocode = Geocode::default();
        for field in wire.fields {
            match field {
                GeocodeField::Name(name) => geocode.names.push(name),
                GeocodeField::Value(value) => geocode.values.push(value),
            }
        }
        geocode
    }
}

impl From<Geocode> for GeocodeWire {
    fn from(geocode: Geocode) -> Self {
        let mut fields = Vec::with_capacity(geocode.names.len() + geocode.values.len());
        let mut values = geocode.values.into_iter();
        for name in geocode.names {
            fields.push(GeocodeField::Name(name));
            if let Some(value) = values.next() {
                fields.push(GeocodeField::Value(value));
            }
        }
        fields.extend(values.map(GeocodeField::Value));
        GeocodeWire { fields }
    }
}

/// Parse an Atom feed document.
pub fn parse_feed(xml: &[u8]) -> Result<Feed> {
    let feed: Feed = quick_xml::de::from_reader(xml)?;
    if feed.xmlns != ATOM_NS {
        return Err(Error::validation(format!(
            "expected feed namespace {ATOM_NS}, found {:?}",
            feed.xmlns
        )));
    }
    Ok(feed)
}

/// Serialize a feed as indented XML, the form published to disk.
pub fn to_xml(feed: &Feed) -> Result<String> {
    let mut out = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut out, Some("feed"))?;
    ser.indent(' ', 2);
    feed.serialize(ser)?;
    Ok(out)
}
