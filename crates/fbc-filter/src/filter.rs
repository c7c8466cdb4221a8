//! The catalog filter engine.
//!
//! A `Filter` is built from a validated configuration plus options, and
//! rewrites a catalog in a single synchronous pass: configuration fan-out,
//! index build, per-package mode dispatch, default-channel reconciliation,
//! deprecation pruning, and sorted bundle reassembly.

use std::sync::Arc;

use fbc_semver::VersionRange;
use indexmap::{IndexMap, IndexSet};

use crate::catalog::{
    Bundle, Catalog, CatalogIndex, Channel, ChannelEntry, Deprecation, Meta, Package,
    SCHEMA_BUNDLE, SCHEMA_CHANNEL, SCHEMA_PACKAGE,
};
use crate::channel::{channel_heads, ChannelGraph};
use crate::config::{ChannelFilter, FilterConfiguration, PackageFilter, SelectedBundle};
use crate::error::{FilterError, Result};
use crate::log::{FilterLog, NullLog};

/// Per-package channel-name or entry-name sets collected while filtering.
type NameSets = IndexMap<String, IndexSet<String>>;

/// The filter engine. Stateless across calls; cheap to share.
pub struct Filter {
    pkg_configs: IndexMap<String, PackageFilter>,
    ch_configs: IndexMap<String, IndexMap<String, ChannelFilter>>,
    log: Arc<dyn FilterLog>,
    full: bool,
}

/// How one configured package is filtered.
enum Mode<'a> {
    /// Keep all entries of the (already pruned) channels.
    Full,
    /// Keep only the explicitly selected bundles.
    Selection(&'a [SelectedBundle]),
    /// Apply the package-level range to every channel.
    PackageRange(VersionRange),
    /// Per listed channel: its own range, or just its head.
    Channels,
    /// Reduce to the default channel and its head.
    DefaultHead,
}

impl Filter {
    /// Build a filter for a configuration, with default options: a no-op
    /// log sink and `full` disabled.
    pub fn new(config: FilterConfiguration) -> Self {
        let mut pkg_configs = IndexMap::new();
        let mut ch_configs: IndexMap<String, IndexMap<String, ChannelFilter>> = IndexMap::new();
        for pkg in config.packages {
            let channels = ch_configs.entry(pkg.name.clone()).or_default();
            for channel in &pkg.channels {
                channels.insert(channel.name.clone(), channel.clone());
            }
            pkg_configs.insert(pkg.name.clone(), pkg);
        }
        Filter {
            pkg_configs,
            ch_configs,
            log: Arc::new(NullLog),
            full: false,
        }
    }

    /// Replace the log sink.
    pub fn with_logger(mut self, log: Arc<dyn FilterLog>) -> Self {
        self.log = log;
        self
    }

    /// Keep whole channels (or the whole catalog) instead of reducing to
    /// channel heads.
    pub fn in_full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    /// Decide whether a streamed record is worth materializing: its package
    /// (or, for the package schema, its own name) must be configured. With
    /// no configured packages this returns false and callers should
    /// materialize everything.
    pub fn keep_meta(&self, meta: &Meta) -> bool {
        if self.pkg_configs.is_empty() {
            return false;
        }
        let package = if meta.schema == SCHEMA_PACKAGE { &meta.name } else { &meta.package };
        self.pkg_configs.contains_key(package.as_str())
    }

    /// Filter the catalog, returning a fresh one that still satisfies the
    /// catalog's structural invariants.
    pub fn filter_catalog(&self, catalog: &Catalog) -> Result<Catalog> {
        if self.pkg_configs.is_empty() {
            if self.full {
                return Ok(catalog.clone());
            }
            return self.default_heads(catalog);
        }
        self.filter_configured(catalog)
    }

    /// Empty configuration: every package is reduced to the head of its
    /// default channel.
    fn default_heads(&self, catalog: &Catalog) -> Result<Catalog> {
        let index = CatalogIndex::build(catalog)?;

        let mut out_channels = Vec::new();
        let mut surviving = NameSets::new();
        let mut kept_entries = NameSets::new();

        for package in &catalog.packages {
            let name = package.name.as_str();
            if package.default_channel.is_empty() {
                if index.channel_names.contains_key(name) {
                    return Err(FilterError::DefaultChannelNotFound {
                        package: package.name.clone(),
                        channel: String::new(),
                    });
                }
                continue;
            }
            let channel = index
                .channels
                .get(name)
                .and_then(|channels| channels.iter().find(|c| c.name == package.default_channel))
                .copied();
            let Some(channel) = channel else {
                return Err(FilterError::DefaultChannelNotFound {
                    package: package.name.clone(),
                    channel: package.default_channel.clone(),
                });
            };

            let entries = head_only(channel)?;
            record(&mut surviving, &mut kept_entries, channel, &entries);
            out_channels.push(rebuilt_channel(channel, entries));
        }

        let bundles = assemble_bundles(&index, &kept_entries);
        let kept_packages: IndexSet<&str> =
            catalog.packages.iter().map(|p| p.name.as_str()).collect();
        let bundle_names = bundle_names_by_package(&bundles);
        let deprecations =
            prune_deprecations(&catalog.deprecations, &kept_packages, &surviving, &bundle_names);

        Ok(Catalog {
            packages: catalog.packages.clone(),
            channels: out_channels,
            bundles,
            deprecations,
            others: catalog.others.clone(),
        })
    }

    fn filter_configured(&self, catalog: &Catalog) -> Result<Catalog> {
        let pruned = self.prune_to_configured(catalog);
        let index = CatalogIndex::build(&pruned)?;

        for name in self.pkg_configs.keys() {
            if !index.packages.contains_key(name.as_str()) {
                tracing::warn!(package = %name, "configured package not found in catalog");
            }
        }

        let mut modes: IndexMap<&str, Mode> = IndexMap::new();
        for (name, cfg) in &self.pkg_configs {
            modes.insert(name.as_str(), self.mode_for(cfg)?);
        }

        // Resolve the target channel of every default-head package up front.
        let mut default_targets: IndexMap<&str, &str> = IndexMap::new();
        for package in &pruned.packages {
            let name = package.name.as_str();
            if !matches!(modes[name], Mode::DefaultHead) {
                continue;
            }
            let cfg = &self.pkg_configs[name];
            let target = cfg
                .default_channel
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(package.default_channel.as_str());
            if target.is_empty() {
                if index.channel_names.contains_key(name) {
                    return Err(FilterError::DefaultChannelNotFound {
                        package: package.name.clone(),
                        channel: String::new(),
                    });
                }
                continue;
            }
            default_targets.insert(name, target);
        }

        let empty_versions = IndexMap::new();
        let mut out_channels = Vec::new();
        let mut surviving = NameSets::new();
        let mut kept_entries = NameSets::new();

        for channel in &pruned.channels {
            let package = channel.package.as_str();
            let versions = index.versions_by_name.get(package).unwrap_or(&empty_versions);

            let entries = match &modes[package] {
                Mode::Full => Some(channel.entries.clone()),
                Mode::DefaultHead => {
                    if default_targets.get(package) == Some(&channel.name.as_str()) {
                        Some(head_only(channel)?)
                    } else {
                        None
                    }
                }
                Mode::Channels => {
                    let range = self
                        .ch_configs
                        .get(package)
                        .and_then(|channels| channels.get(channel.name.as_str()))
                        .and_then(|cfg| cfg.version_range.as_deref())
                        .filter(|range| !range.is_empty());
                    match range {
                        None => Some(head_only(channel)?),
                        Some(range_str) => {
                            let range = VersionRange::parse(range_str)
                                .map_err(FilterError::VersionRangeParse)?;
                            let graph = ChannelGraph::new(channel)?;
                            let keep =
                                graph.filter_by_version_range(&range, versions, self.log.as_ref());
                            if keep.is_empty() {
                                return Err(FilterError::EmptyChannel {
                                    package: channel.package.clone(),
                                    channel: channel.name.clone(),
                                    range: range_str.to_string(),
                                });
                            }
                            let entries = graph.rebuild_entries(&keep);
                            graph.verify_single_head(&entries)?;
                            Some(entries)
                        }
                    }
                }
                Mode::PackageRange(range) => {
                    let graph = ChannelGraph::new(channel)?;
                    let keep = graph.filter_by_version_range(range, versions, self.log.as_ref());
                    if keep.is_empty() {
                        tracing::debug!(
                            package,
                            channel = %channel.name,
                            "no bundles in requested version range, dropping channel"
                        );
                        None
                    } else {
                        let entries = graph.rebuild_entries(&keep);
                        graph.verify_single_head(&entries)?;
                        Some(entries)
                    }
                }
                Mode::Selection(selection) => {
                    let graph = ChannelGraph::new(channel)?;
                    let present = index
                        .channel_entries
                        .get(package)
                        .and_then(|channels| channels.get(channel.name.as_str()));
                    let keep: IndexSet<&str> = selection
                        .iter()
                        .map(|b| b.name.as_str())
                        .filter(|name| present.is_some_and(|entries| entries.contains_key(name)))
                        .collect();
                    if keep.is_empty() {
                        None
                    } else {
                        let entries = graph.rebuild_entries(&keep);
                        if channel_heads(&entries).len() != 1 {
                            return Err(FilterError::InvalidatedChannel {
                                package: channel.package.clone(),
                                channel: channel.name.clone(),
                            });
                        }
                        Some(entries)
                    }
                }
            };

            if let Some(entries) = entries {
                record(&mut surviving, &mut kept_entries, channel, &entries);
                out_channels.push(rebuilt_channel(channel, entries));
            }
        }

        let mut out_packages = Vec::with_capacity(pruned.packages.len());
        for package in &pruned.packages {
            let cfg = &self.pkg_configs[package.name.as_str()];
            let mut out_pkg = package.clone();
            reconcile_default_channel(&mut out_pkg, cfg, surviving.get(package.name.as_str()))?;
            out_packages.push(out_pkg);
        }

        let bundles = assemble_bundles(&index, &kept_entries);
        let kept_packages: IndexSet<&str> =
            out_packages.iter().map(|p| p.name.as_str()).collect();
        let bundle_names = bundle_names_by_package(&bundles);
        let deprecations =
            prune_deprecations(&pruned.deprecations, &kept_packages, &surviving, &bundle_names);

        Ok(Catalog {
            packages: out_packages,
            channels: out_channels,
            bundles,
            deprecations,
            others: pruned.others,
        })
    }

    /// Plain membership pruning against the configured packages and, where
    /// a package lists channels, the listed channel names. Preserves order.
    fn prune_to_configured(&self, catalog: &Catalog) -> Catalog {
        let keep_pkg = |name: &str| self.pkg_configs.contains_key(name);
        Catalog {
            packages: catalog
                .packages
                .iter()
                .filter(|p| keep_pkg(&p.name))
                .cloned()
                .collect(),
            channels: catalog
                .channels
                .iter()
                .filter(|c| {
                    self.ch_configs
                        .get(c.package.as_str())
                        .is_some_and(|listed| listed.is_empty() || listed.contains_key(c.name.as_str()))
                })
                .cloned()
                .collect(),
            bundles: catalog
                .bundles
                .iter()
                .filter(|b| keep_pkg(&b.package))
                .cloned()
                .collect(),
            deprecations: catalog
                .deprecations
                .iter()
                .filter(|d| keep_pkg(&d.package))
                .cloned()
                .collect(),
            others: catalog
                .others
                .iter()
                .filter(|m| m.package.is_empty() || keep_pkg(&m.package))
                .cloned()
                .collect(),
        }
    }

    fn mode_for<'a>(&self, cfg: &'a PackageFilter) -> Result<Mode<'a>> {
        let has_range = cfg.version_range.is_some()
            || cfg.channels.iter().any(|c| c.version_range.is_some());
        if !cfg.bundles.is_empty() {
            if self.full {
                return Err(FilterError::FullWithBundleSelection);
            }
            if has_range {
                return Err(FilterError::VersionRangeWithBundleSelection);
            }
            return Ok(Mode::Selection(&cfg.bundles));
        }
        if self.full {
            if has_range {
                return Err(FilterError::FullWithVersionRange);
            }
            return Ok(Mode::Full);
        }
        if let Some(range) = &cfg.version_range {
            let range = VersionRange::parse(range).map_err(FilterError::VersionRangeParse)?;
            return Ok(Mode::PackageRange(range));
        }
        if !cfg.channels.is_empty() {
            return Ok(Mode::Channels);
        }
        Ok(Mode::DefaultHead)
    }
}

/// Reduce a channel to its head entry.
fn head_only(channel: &Channel) -> Result<Vec<ChannelEntry>> {
    let graph = ChannelGraph::new(channel)?;
    let keep: IndexSet<&str> = IndexSet::from([graph.head().name.as_str()]);
    Ok(graph.rebuild_entries(&keep))
}

fn rebuilt_channel(channel: &Channel, entries: Vec<ChannelEntry>) -> Channel {
    Channel {
        package: channel.package.clone(),
        name: channel.name.clone(),
        entries,
        extra: channel.extra.clone(),
    }
}

fn record(surviving: &mut NameSets, kept_entries: &mut NameSets, channel: &Channel, entries: &[ChannelEntry]) {
    surviving
        .entry(channel.package.clone())
        .or_default()
        .insert(channel.name.clone());
    let kept = kept_entries.entry(channel.package.clone()).or_default();
    for entry in entries {
        kept.insert(entry.name.clone());
    }
}

fn reconcile_default_channel(
    package: &mut Package,
    cfg: &PackageFilter,
    surviving: Option<&IndexSet<String>>,
) -> Result<()> {
    let survives = |name: &str| surviving.is_some_and(|s| s.contains(name));
    let override_channel = cfg.default_channel.as_deref().filter(|s| !s.is_empty());

    // neither side names a default: nothing to do
    if package.default_channel.is_empty() && override_channel.is_none() {
        return Ok(());
    }

    if let Some(name) = override_channel {
        if !survives(name) {
            return Err(FilterError::DefaultChannelOverrideMissing {
                package: package.name.clone(),
                channel: name.to_string(),
            });
        }
        package.default_channel = name.to_string();
        return Ok(());
    }

    if !survives(&package.default_channel) {
        return Err(FilterError::DefaultChannelFilteredOut {
            package: package.name.clone(),
            channel: package.default_channel.clone(),
        });
    }
    Ok(())
}

/// Materialize the kept entry names as bundles, sorted by (package, name).
/// Kept names with no bundle record are phantoms and are skipped.
fn assemble_bundles(index: &CatalogIndex, kept_entries: &NameSets) -> Vec<Bundle> {
    let mut out: Vec<Bundle> = Vec::new();
    for (package, names) in kept_entries {
        let Some(by_name) = index.bundles_by_name.get(package.as_str()) else {
            continue;
        };
        for name in names {
            if let Some(bundle) = by_name.get(name.as_str()) {
                out.push((*bundle).clone());
            }
        }
    }
    out.sort_by(|a, b| a.package.cmp(&b.package).then_with(|| a.name.cmp(&b.name)));
    out
}

fn bundle_names_by_package(bundles: &[Bundle]) -> NameSets {
    let mut out = NameSets::new();
    for bundle in bundles {
        out.entry(bundle.package.clone())
            .or_default()
            .insert(bundle.name.clone());
    }
    out
}

/// Drop deprecation entries whose channel or bundle reference is absent from
/// the filtered output; package-scoped entries follow their package.
fn prune_deprecations(
    deprecations: &[Deprecation],
    kept_packages: &IndexSet<&str>,
    kept_channels: &NameSets,
    kept_bundles: &NameSets,
) -> Vec<Deprecation> {
    let contains = |sets: &NameSets, package: &str, name: &str| {
        sets.get(package).is_some_and(|s| s.contains(name))
    };
    deprecations
        .iter()
        .filter(|d| kept_packages.contains(d.package.as_str()))
        .map(|d| {
            let mut out = d.clone();
            out.entries.retain(|e| match e.reference.schema.as_str() {
                SCHEMA_CHANNEL => contains(kept_channels, &d.package, &e.reference.name),
                SCHEMA_BUNDLE => contains(kept_bundles, &d.package, &e.reference.name),
                _ => true,
            });
            out
        })
        .collect()
}
