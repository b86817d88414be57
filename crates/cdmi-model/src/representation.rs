//! JSON representations exchanged with dialect clients and parsed from the
//! backend.
//!
//! Outbound types serialize with the dialect's camelCase field names. Inbound
//! envelopes tolerate unknown fields and missing keys.

use serde::{Deserialize, Serialize};

use crate::metadata::MetadataMap;
use crate::path::concat_parts;

/// `completionStatus` value for finished operations.
pub const COMPLETE: &str = "Complete";

/// Container representation returned by reads and creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRepresentation {
    /// Always the dialect container content type.
    pub object_type: String,
    /// Container name, slash-terminated.
    pub object_name: String,
    /// URI of the enclosing container, slash-terminated.
    #[serde(rename = "parentURI")]
    pub parent_uri: String,
    /// URI of the container capability document.
    #[serde(rename = "capabilitiesURI")]
    pub capabilities_uri: String,
    /// Always [`COMPLETE`].
    pub completion_status: String,
    /// Dialect metadata.
    pub metadata: MetadataMap,
    /// Child names; sub-containers are slash-terminated. Omitted on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    /// `0-<count>`. Omitted on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_range: Option<String>,
}

/// Data object representation returned by reads and creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRepresentation {
    /// Always the dialect object content type.
    pub object_type: String,
    /// Object name (last path segment).
    pub object_name: String,
    /// URI of the enclosing container, slash-terminated.
    #[serde(rename = "parentURI")]
    pub parent_uri: String,
    /// URI of the data object capability document.
    #[serde(rename = "capabilitiesURI")]
    pub capabilities_uri: String,
    /// Always [`COMPLETE`].
    pub completion_status: String,
    /// Dialect metadata.
    pub metadata: MetadataMap,
    /// Stored content type. Omitted on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// `utf-8` or `base64`. Omitted on create.
    #[serde(rename = "valuetransferencoding", skip_serializing_if = "Option::is_none")]
    pub value_transfer_encoding: Option<String>,
    /// Object value, encoded per `valuetransferencoding`. Omitted on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `0-<length>`. Omitted on create.
    #[serde(rename = "valuerange", skip_serializing_if = "Option::is_none")]
    pub value_range: Option<String>,
}

/// Static capability document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRepresentation {
    /// Always the dialect capability content type.
    pub object_type: String,
    /// Capability node name, slash-terminated.
    pub object_name: String,
    /// URI of the parent node.
    #[serde(rename = "parentURI")]
    pub parent_uri: String,
    /// Capability flags.
    pub capabilities: serde_json::Map<String, serde_json::Value>,
    /// Child capability nodes.
    pub children: Vec<String>,
    /// `0-<n>`.
    pub children_range: String,
    /// Always [`COMPLETE`].
    pub completion_status: String,
}

/// Inbound data object envelope.
///
/// Multi-part requests may carry several envelope parts; later parts
/// overwrite earlier fields (see [`ObjectEnvelope::merge`]).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObjectEnvelope {
    /// Content type of the value.
    pub mimetype: Option<String>,
    /// Metadata entries.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// Object value.
    pub value: Option<String>,
    /// `utf-8` (default) or `base64`.
    pub valuetransferencoding: Option<String>,
    /// Source of a server-side copy, as `<container>/<key>`.
    pub copy: Option<String>,
}

impl ObjectEnvelope {
    /// Overwrite fields of `self` with the fields present in `other`.
    pub fn merge(&mut self, other: Self) {
        if other.mimetype.is_some() {
            self.mimetype = other.mimetype;
        }
        if other.metadata.is_some() {
            self.metadata = other.metadata;
        }
        if other.value.is_some() {
            self.value = other.value;
        }
        if other.valuetransferencoding.is_some() {
            self.valuetransferencoding = other.valuetransferencoding;
        }
        if other.copy.is_some() {
            self.copy = other.copy;
        }
    }
}

/// Inbound container envelope. Only metadata is honored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContainerEnvelope {
    /// Metadata entries.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// One entry of a backend JSON listing.
///
/// Container listings yield either `name` (a real object) or `subdir` (a
/// common prefix under the delimiter). Account listings yield `name` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Object or container name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Common prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
    /// Stored content type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Stored size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Object count (account listings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Content hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl ListingEntry {
    /// `name` if present, else `subdir`.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.subdir.as_deref().filter(|s| !s.is_empty()))
    }

    /// Whether the entry is a directory marker or a common prefix.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        (self.subdir.is_some() && self.name.is_none())
            || self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("directory"))
    }
}

/// A slash-terminated dialect URI: `/<root>/<parts...>/`.
#[must_use]
pub fn dialect_uri(root: &str, parts: &[&str]) -> String {
    let mut all = Vec::with_capacity(parts.len() + 1);
    all.push(root);
    all.extend_from_slice(parts);
    let joined = concat_parts(&all);
    if joined.is_empty() {
        "/".to_owned()
    } else {
        format!("/{joined}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_container_with_dialect_field_names() {
        let repr = ContainerRepresentation {
            object_type: "application/cdmi-container".to_owned(),
            object_name: "photos/".to_owned(),
            parent_uri: "/cdmi/acct/".to_owned(),
            capabilities_uri: "/cdmi/acct/cdmi_capabilities/container/".to_owned(),
            completion_status: COMPLETE.to_owned(),
            metadata: MetadataMap::new(),
            children: Some(vec!["a".to_owned()]),
            children_range: Some("0-1".to_owned()),
        };
        let json = serde_json::to_value(&repr).expect("serialize");
        assert_eq!(json["objectType"], "application/cdmi-container");
        assert_eq!(json["parentURI"], "/cdmi/acct/");
        assert_eq!(json["capabilitiesURI"], "/cdmi/acct/cdmi_capabilities/container/");
        assert_eq!(json["childrenRange"], "0-1");
        assert_eq!(json["completionStatus"], "Complete");
    }

    #[test]
    fn test_should_omit_read_only_object_fields_on_create() {
        let repr = ObjectRepresentation {
            object_type: "application/cdmi-object".to_owned(),
            object_name: "o".to_owned(),
            parent_uri: "/cdmi/a/c/".to_owned(),
            capabilities_uri: "/cdmi/a/cdmi_capabilities/dataobject/".to_owned(),
            completion_status: COMPLETE.to_owned(),
            metadata: MetadataMap::new(),
            mimetype: None,
            value_transfer_encoding: None,
            value: None,
            value_range: None,
        };
        let json = serde_json::to_value(&repr).expect("serialize");
        let obj = json.as_object().expect("object");
        assert!(!obj.contains_key("value"));
        assert!(!obj.contains_key("valuerange"));
    }

    #[test]
    fn test_should_merge_envelopes_field_by_field() {
        let mut first: ObjectEnvelope =
            serde_json::from_str(r#"{"mimetype":"text/plain","value":"a"}"#).expect("parse");
        let second: ObjectEnvelope =
            serde_json::from_str(r#"{"metadata":{"k":"v"}}"#).expect("parse");
        first.merge(second);
        assert_eq!(first.mimetype.as_deref(), Some("text/plain"));
        assert_eq!(first.value.as_deref(), Some("a"));
        assert!(first.metadata.is_some());
    }

    #[test]
    fn test_should_parse_listing_entry_forms() {
        let entries: Vec<ListingEntry> = serde_json::from_str(
            r#"[{"name":"a.txt","content_type":"text/plain","bytes":3},{"subdir":"dir/"}]"#,
        )
        .expect("parse");
        assert_eq!(entries[0].display_name(), Some("a.txt"));
        assert!(!entries[0].is_directory());
        assert_eq!(entries[1].display_name(), Some("dir/"));
        assert!(entries[1].is_directory());
    }

    #[test]
    fn test_should_build_slash_terminated_uris() {
        assert_eq!(dialect_uri("cdmi", &["acct", "c", ""]), "/cdmi/acct/c/");
        assert_eq!(dialect_uri("cdmi", &[]), "/cdmi/");
        assert_eq!(dialect_uri("api/cdmi", &["a"]), "/api/cdmi/a/");
    }
}
