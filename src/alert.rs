//! CAP alert document model, covering schema versions 1.1 and 1.2.
//!
//! The two versions share one logical shape and differ only in the namespace
//! of the `<alert>` root element, so both parse into the same [`Alert`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{search, search_all, NamedValue, TimeStr};

/// Namespace of a CAP 1.2 `<alert>` root element.
pub const CAP_1_2_NS: &str = "urn:oasis:names:tc:emergency:cap:1.2";
/// Namespace of a CAP 1.1 `<alert>` root element.
pub const CAP_1_1_NS: &str = "urn:oasis:names:tc:emergency:cap:1.1";

/// A single CAP alert message.
///
/// ```xml
/// <alert xmlns="urn:oasis:names:tc:emergency:cap:1.2">
///   <identifier>KAR0-0306112239-SW</identifier>
///   <sender>KARO@CLETS.DOJ.CA.GOV</sender>
///   <sent>2003-06-11T22:39:00-07:00</sent>
///   ...
/// </alert>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Root namespace; distinguishes a 1.1 document from a 1.2 one.
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    /// Unique identifier of the alert message.
    pub identifier: String,
    /// Identifier of the originator, typically an address.
    pub sender: String,
    /// Origination time of the alert message.
    pub sent: TimeStr,
    /// Handling code: `Actual`, `Exercise`, `System`, `Test`, or `Draft`.
    pub status: String,
    /// Nature of the message: `Alert`, `Update`, `Cancel`, `Ack`, `Error`.
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Intended distribution: `Public`, `Restricted`, or `Private`.
    pub scope: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restriction: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub addresses: String,
    /// Profile codes the message conforms to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// Earlier messages this one refers to or replaces. A correction is a
    /// new alert with a new identifier referencing the old one here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incidents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<Info>,
}

/// A localized detail block within an alert. An alert may carry several,
/// e.g. one per language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    /// Event categories; well-formed messages carry at least one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    /// Text denoting the type of the subject event.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_type: Vec<String>,
    pub urgency: String,
    pub severity: String,
    pub certainty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub audience: String,
    /// System-specific event codes, e.g. `SAME`/`CAE`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_code: Vec<NamedValue>,
    #[serde(default, skip_serializing_if = "TimeStr::is_empty")]
    pub effective: TimeStr,
    #[serde(default, skip_serializing_if = "TimeStr::is_empty")]
    pub onset: TimeStr,
    #[serde(default, skip_serializing_if = "TimeStr::is_empty")]
    pub expires: TimeStr,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub headline: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instruction: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub web: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<NamedValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub area: Vec<Area>,
}

impl Info {
    /// Value of the first parameter named `name`, or `""`.
    pub fn parameter_value(&self, name: &str) -> &str {
        search(&self.parameter, name)
    }

    /// Append a parameter; existing entries with the same name are kept.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameter.push(NamedValue::new(name, value));
    }
}

/// Supplemental content referenced by an info block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub resource_desc: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deref_uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
}

/// Geographic scope of an info block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    /// Free-text description of the affected area.
    #[serde(default)]
    pub area_desc: String,
    /// Point lists delineating the affected area, one string per polygon.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub circle: Vec<String>,
    /// Coded geographic identifiers, e.g. `SAME`/`006037`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geocode: Vec<NamedValue>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub altitude: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ceiling: String,
}

impl Area {
    /// Value of the first geocode named `name`, or `""`.
    pub fn geocode_value(&self, name: &str) -> &str {
        search(&self.geocode, name)
    }

    /// Every geocode value recorded under `name`, in order.
    pub fn geocode_values(&self, name: &str) -> Vec<&str> {
        search_all(&self.geocode, name)
    }

    /// Append a geocode; existing entries with the same name are kept.
    pub fn add_geocode(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.geocode.push(NamedValue::new(name, value));
    }
}

/// Parse a CAP 1.2 alert document.
pub fn parse_alert(xml: &[u8]) -> Result<Alert> {
    parse_versioned(xml, CAP_1_2_NS)
}

/// Parse a CAP 1.1 alert document. Same shape, earlier namespace.
pub fn parse_alert_v11(xml: &[u8]) -> Result<Alert> {
    parse_versioned(xml, CAP_1_1_NS)
}

fn parse_versioned(xml: &[u8], ns: &str) -> Result<Alert> {
    let alert: Alert = quick_xml::de::from_reader(xml)?;
    if alert.xmlns != ns {
        return Err(Error::validation(format!(
            "expected alert namespace {ns}, found {:?}",
            alert.xmlns
        )));
    }
    Ok(alert)
}
