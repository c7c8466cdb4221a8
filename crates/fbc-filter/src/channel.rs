//! Upgrade-graph model for a single channel.
//!
//! Each channel is an adjacency table keyed by bundle name. Entries are
//! nodes with out-edges through `replaces` (at most one) and `skips`;
//! referenced names that are not entries themselves are phantom nodes with
//! no payload. The graph is built and discarded per channel.

use fbc_semver::{Version, VersionRange};
use indexmap::{IndexMap, IndexSet};

use crate::catalog::{Channel, ChannelEntry};
use crate::error::{FilterError, Result};
use crate::log::FilterLog;

#[derive(Debug)]
struct Node<'a> {
    /// `None` marks a phantom: a name only referenced by other entries.
    entry: Option<&'a ChannelEntry>,
    /// Names of entries that replace or skip this node.
    incoming: Vec<&'a str>,
}

#[derive(Debug)]
pub(crate) struct ChannelGraph<'a> {
    package: &'a str,
    name: &'a str,
    entries: &'a [ChannelEntry],
    nodes: IndexMap<&'a str, Node<'a>>,
    head: &'a ChannelEntry,
}

impl<'a> ChannelGraph<'a> {
    /// Build the graph and locate the unique head: the entry no other entry
    /// replaces or skips. Zero heads means the graph is cyclic.
    pub fn new(channel: &'a Channel) -> Result<Self> {
        let mut nodes: IndexMap<&str, Node> = IndexMap::new();
        for entry in &channel.entries {
            nodes.insert(entry.name.as_str(), Node { entry: Some(entry), incoming: Vec::new() });
        }
        for entry in &channel.entries {
            let targets = entry.replaces.iter().chain(entry.skips.iter());
            for target in targets {
                nodes
                    .entry(target.as_str())
                    .or_insert(Node { entry: None, incoming: Vec::new() })
                    .incoming
                    .push(entry.name.as_str());
            }
        }

        let heads: Vec<&ChannelEntry> = nodes
            .values()
            .filter_map(|n| n.entry.filter(|_| n.incoming.is_empty()))
            .collect();

        let head = match heads.as_slice() {
            [head] => *head,
            [] => {
                return Err(FilterError::NoChannelHead {
                    package: channel.package.clone(),
                    channel: channel.name.clone(),
                })
            }
            _ => {
                return Err(FilterError::MultipleChannelHeads {
                    package: channel.package.clone(),
                    channel: channel.name.clone(),
                    heads: heads.iter().map(|e| e.name.clone()).collect(),
                })
            }
        };

        Ok(ChannelGraph {
            package: channel.package.as_str(),
            name: channel.name.as_str(),
            entries: &channel.entries,
            nodes,
            head,
        })
    }

    pub fn head(&self) -> &'a ChannelEntry {
        self.head
    }

    pub fn is_phantom(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|n| n.entry.is_none())
    }

    /// Entry names to retain for a version range:
    ///
    /// 1. every entry whose bundle version satisfies the range;
    /// 2. to a fixed point, every entry whose `skips` reach into the keep
    ///    set, so the skipped upgrades stay reachable;
    /// 3. entries between the shallowest and deepest kept node on the
    ///    head's `replaces` chain, so kept chain segments stay connected.
    ///
    /// Every admission with a known version is reported to the log sink.
    /// An empty result means no entry satisfied the range.
    pub fn filter_by_version_range(
        &self,
        range: &VersionRange,
        versions: &IndexMap<&str, Version>,
        log: &dyn FilterLog,
    ) -> IndexSet<&'a str> {
        let mut keep: IndexSet<&'a str> = IndexSet::new();

        let include = |keep: &mut IndexSet<&'a str>, name: &'a str| {
            if keep.insert(name) {
                if let Some(version) = versions.get(name) {
                    log.info(&format!("including bundle {:?} with version \"{}\"", name, version));
                }
            }
        };

        for entry in self.entries {
            if let Some(version) = versions.get(entry.name.as_str()) {
                if range.matches(version) {
                    include(&mut keep, &entry.name);
                }
            }
        }

        loop {
            let mut changed = false;
            for entry in self.entries {
                if keep.contains(entry.name.as_str()) {
                    continue;
                }
                if entry.skips.iter().any(|s| keep.contains(s.as_str())) {
                    include(&mut keep, &entry.name);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let chain = self.replaces_chain();
        let kept_positions: Vec<usize> = chain
            .iter()
            .enumerate()
            .filter(|(_, name)| keep.contains(**name))
            .map(|(i, _)| i)
            .collect();
        if let (Some(&first), Some(&last)) = (kept_positions.first(), kept_positions.last()) {
            for name in chain[first..=last].iter().copied() {
                include(&mut keep, name);
            }
        }

        keep
    }

    /// The linear `replaces` chain starting at the head, ending at the first
    /// phantom or already-visited name.
    fn replaces_chain(&self) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut seen = IndexSet::new();
        let mut current = Some(self.head);
        while let Some(entry) = current {
            if !seen.insert(entry.name.as_str()) {
                break;
            }
            chain.push(entry.name.as_str());
            current = entry
                .replaces
                .as_deref()
                .and_then(|r| self.nodes.get(r))
                .and_then(|n| n.entry);
        }
        chain
    }

    /// Rebuild the channel's entry list for a keep set, preserving order.
    /// Surviving entries lose edges to dropped entries: `skips` keep only
    /// kept or phantom targets, `replaces` is cleared unless kept or phantom.
    pub fn rebuild_entries(&self, keep: &IndexSet<&str>) -> Vec<ChannelEntry> {
        self.entries
            .iter()
            .filter(|e| keep.contains(e.name.as_str()))
            .map(|e| {
                let mut entry = e.clone();
                if let Some(replaces) = entry.replaces.as_deref() {
                    if !keep.contains(replaces) && !self.is_phantom(replaces) {
                        entry.replaces = None;
                    }
                }
                entry.skips.retain(|s| keep.contains(s.as_str()) || self.is_phantom(s));
                entry
            })
            .collect()
    }

    /// Verify that an already-rebuilt entry list still has exactly one head.
    pub fn verify_single_head(&self, entries: &[ChannelEntry]) -> Result<()> {
        let heads = channel_heads(entries);
        match heads.len() {
            1 => Ok(()),
            0 => Err(FilterError::NoChannelHead {
                package: self.package.to_string(),
                channel: self.name.to_string(),
            }),
            _ => Err(FilterError::MultipleChannelHeads {
                package: self.package.to_string(),
                channel: self.name.to_string(),
                heads: heads.into_iter().map(str::to_string).collect(),
            }),
        }
    }
}

/// Heads of an entry list: entries not replaced or skipped by any other.
pub(crate) fn channel_heads(entries: &[ChannelEntry]) -> Vec<&str> {
    let mut referenced: IndexSet<&str> = IndexSet::new();
    for entry in entries {
        referenced.extend(entry.replaces.as_deref());
        referenced.extend(entry.skips.iter().map(String::as_str));
    }
    entries
        .iter()
        .map(|e| e.name.as_str())
        .filter(|name| !referenced.contains(name))
        .collect()
}
