//! Lookup indices over a parsed catalog.

use fbc_semver::Version;
use indexmap::{IndexMap, IndexSet};

use super::{Bundle, Catalog, Channel, ChannelEntry, Package, PackageProperty};
use crate::error::{FilterError, Result};

/// Read-only lookup maps built by a single pass over a catalog. Lives for
/// the duration of one filter call.
#[derive(Debug)]
pub(crate) struct CatalogIndex<'a> {
    /// package name → package
    pub packages: IndexMap<&'a str, &'a Package>,
    /// package name → channels, in catalog order
    pub channels: IndexMap<&'a str, Vec<&'a Channel>>,
    /// package name → channel name set
    pub channel_names: IndexMap<&'a str, IndexSet<&'a str>>,
    /// package name → channel name → entry name → entry
    pub channel_entries: IndexMap<&'a str, IndexMap<&'a str, IndexMap<&'a str, &'a ChannelEntry>>>,
    /// package name → bundle name → bundle
    pub bundles_by_name: IndexMap<&'a str, IndexMap<&'a str, &'a Bundle>>,
    /// package name → bundle name → parsed version
    pub versions_by_name: IndexMap<&'a str, IndexMap<&'a str, Version>>,
}

impl<'a> CatalogIndex<'a> {
    /// Index the catalog. Fails if any bundle lacks a package property or
    /// carries a version that is not strict semver.
    pub fn build(catalog: &'a Catalog) -> Result<Self> {
        let mut index = CatalogIndex {
            packages: IndexMap::new(),
            channels: IndexMap::new(),
            channel_names: IndexMap::new(),
            channel_entries: IndexMap::new(),
            bundles_by_name: IndexMap::new(),
            versions_by_name: IndexMap::new(),
        };

        for package in &catalog.packages {
            index.packages.insert(&package.name, package);
        }

        for channel in &catalog.channels {
            let package = channel.package.as_str();
            index.channels.entry(package).or_default().push(channel);
            index
                .channel_names
                .entry(package)
                .or_default()
                .insert(channel.name.as_str());
            let entries = index
                .channel_entries
                .entry(package)
                .or_default()
                .entry(channel.name.as_str())
                .or_default();
            for entry in &channel.entries {
                entries.insert(entry.name.as_str(), entry);
            }
        }

        for bundle in &catalog.bundles {
            let version = bundle_version(bundle)?;
            let package = bundle.package.as_str();
            index
                .bundles_by_name
                .entry(package)
                .or_default()
                .entry(bundle.name.as_str())
                .or_insert(bundle);
            index
                .versions_by_name
                .entry(package)
                .or_default()
                .insert(bundle.name.as_str(), version);
        }

        Ok(index)
    }
}

fn bundle_version(bundle: &Bundle) -> Result<Version> {
    let value = bundle
        .package_property()
        .ok_or_else(|| FilterError::MissingPackageProperty {
            package: bundle.package.clone(),
            bundle: bundle.name.clone(),
        })?;
    let property: PackageProperty =
        serde_json::from_value(value.clone()).map_err(|source| FilterError::InvalidPackageProperty {
            package: bundle.package.clone(),
            bundle: bundle.name.clone(),
            source,
        })?;
    Version::parse(&property.version).map_err(|source| FilterError::InvalidBundleVersion {
        package: bundle.package.clone(),
        bundle: bundle.name.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Property;

    fn bundle(package: &str, name: &str, version: &str) -> Bundle {
        Bundle {
            package: package.to_string(),
            name: name.to_string(),
            properties: vec![Property {
                property_type: super::super::PROPERTY_TYPE_PACKAGE.to_string(),
                value: serde_json::json!({"packageName": package, "version": version}),
            }],
            extra: Default::default(),
        }
    }

    fn sample_catalog() -> Catalog {
        Catalog {
            packages: vec![Package {
                name: "pkg1".to_string(),
                default_channel: "stable".to_string(),
                extra: Default::default(),
            }],
            channels: vec![Channel {
                package: "pkg1".to_string(),
                name: "stable".to_string(),
                entries: vec![
                    ChannelEntry {
                        name: "b2".to_string(),
                        replaces: Some("b1".to_string()),
                        ..Default::default()
                    },
                    ChannelEntry { name: "b1".to_string(), ..Default::default() },
                ],
                extra: Default::default(),
            }],
            bundles: vec![bundle("pkg1", "b1", "1.0.0"), bundle("pkg1", "b2", "2.0.0")],
            ..Default::default()
        }
    }

    #[test]
    fn test_build() {
        let catalog = sample_catalog();
        let index = CatalogIndex::build(&catalog).unwrap();

        assert!(index.packages.contains_key("pkg1"));
        assert_eq!(index.channels["pkg1"].len(), 1);
        assert!(index.channel_names["pkg1"].contains("stable"));
        assert!(index.channel_entries["pkg1"]["stable"].contains_key("b2"));
        assert!(index.bundles_by_name["pkg1"].contains_key("b1"));
        assert_eq!(
            index.versions_by_name["pkg1"]["b2"],
            Version::parse("2.0.0").unwrap()
        );
    }

    #[test]
    fn test_missing_package_property_fails_build() {
        let mut catalog = sample_catalog();
        catalog.bundles.push(Bundle {
            package: "pkg1".to_string(),
            name: "b3".to_string(),
            ..Default::default()
        });

        let err = CatalogIndex::build(&catalog).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bundle \"b3\" in package \"pkg1\" has no package property"
        );
    }

    #[test]
    fn test_loose_version_fails_build() {
        let mut catalog = sample_catalog();
        catalog.bundles.push(bundle("pkg1", "b3", "v1.2"));

        let err = CatalogIndex::build(&catalog).unwrap_err();
        assert!(err.to_string().contains("has an invalid version"));
    }
}
