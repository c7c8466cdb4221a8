//! Declarative catalog model.
//!
//! The shape mirrors the file-based catalog format: packages, channels with
//! their upgrade-graph entries, bundles, per-package deprecations, and opaque
//! pass-through records. Unknown fields on each record are preserved through
//! a flattened map so documents round-trip untouched.

mod index;

pub(crate) use index::CatalogIndex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SCHEMA_PACKAGE: &str = "olm.package";
pub const SCHEMA_CHANNEL: &str = "olm.channel";
pub const SCHEMA_BUNDLE: &str = "olm.bundle";
pub const SCHEMA_DEPRECATIONS: &str = "olm.deprecations";

/// Property type on a bundle that carries its package name and version.
pub const PROPERTY_TYPE_PACKAGE: &str = "olm.package";

/// A parsed catalog. Input catalogs are treated as read-only; filtering
/// produces a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundles: Vec<Bundle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deprecations: Vec<Deprecation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub others: Vec<Meta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_channel: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub package: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ChannelEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One placement of a bundle in a channel's upgrade graph.
///
/// `replaces` and `skips` may name bundles that are not entries themselves
/// (phantom predecessors); `skip_range` is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_range: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub package: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub value: Value,
}

/// Payload of the `olm.package` property on a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageProperty {
    pub package_name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
    pub package: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<DeprecationEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    pub reference: Reference,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// A schema-tagged reference to a package, channel or bundle. The name is
/// empty for package-scoped references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub schema: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// An opaque catalog record, identified by schema and (optionally) package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schema: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bundle {
    /// Returns the `olm.package` property value, if any.
    pub fn package_property(&self) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.property_type == PROPERTY_TYPE_PACKAGE)
            .map(|p| &p.value)
    }
}
