//! Asset topology resolver
//!
//! The state machine at the heart of the agent: it consumes the stream of
//! asset-change events, discovers which record is the local device, keeps
//! the chain of ancestor locations for it, and tells the owning loop when
//! the published location needs to change.
//!
//! ## Event flow
//!
//! ```text
//! asset event → feed() → (identify self | cache update) → resolve chain
//!                                                     ↘ directory lookup on cache miss
//! ```
//!
//! The resolver is single-owner and fully synchronous: `feed` recomputes
//! the chain in place, and a slow directory reply blocks the calling loop
//! for up to the lookup timeout before the attempt is abandoned. A failed
//! resolution is only retried when the next relevant event arrives.

use std::collections::HashSet;
use std::net::IpAddr;

use tracing::{debug, info, warn};

use crate::cache::AssetCache;
use crate::directory::AssetDirectory;
use crate::identity;
use crate::{AssetOperation, AssetRecord};

/// Cap on `parent_name.<i>` levels, guards against cyclic or malformed
/// ancestor data.
pub const MAX_ANCESTOR_LEVELS: usize = 99;

const ASSET_URI_PREFIX: &str = "/asset";

/// Resolution state of the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    /// Still collecting the records needed to resolve the full chain.
    Discovering,

    /// The chain resolved; only cached assets are relevant now.
    UpToDate,
}

/// What the owning loop should do after feeding one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The event is irrelevant to the current topology.
    Ignored,

    /// The topology is currently unknown; nothing to announce.
    Unresolved,

    /// The topology (or the self record) changed; re-publish the
    /// location announcement.
    Changed,
}

pub struct TopologyResolver {
    iname: Option<String>,
    state: ResolverState,
    cache: AssetCache,
    directory: Option<Box<dyn AssetDirectory>>,
    local_addresses: Box<dyn Fn() -> HashSet<IpAddr>>,
}

impl TopologyResolver {
    /// Resolver with no identity yet; the local device is discovered from
    /// the event stream by address matching.
    pub fn new() -> Self {
        Self {
            iname: None,
            state: ResolverState::Discovering,
            cache: AssetCache::new(),
            directory: None,
            local_addresses: Box::new(identity::local_addresses),
        }
    }

    /// Resolver for a caller that already knows the local internal name.
    pub fn with_identity(iname: impl Into<String>) -> Self {
        let mut resolver = Self::new();
        resolver.iname = Some(iname.into());
        resolver
    }

    /// Wire the directory used for on-demand ancestor lookups. Without
    /// one, any chain containing an uncached ancestor stays unresolved.
    pub fn with_directory(mut self, directory: impl AssetDirectory + 'static) -> Self {
        self.directory = Some(Box::new(directory));
        self
    }

    /// Replace the local-address source (tests substitute a fixed set).
    pub fn with_address_source(
        mut self,
        source: impl Fn() -> HashSet<IpAddr> + 'static,
    ) -> Self {
        self.local_addresses = Box::new(source);
        self
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// Internal name of the local device, once identified.
    pub fn self_identity(&self) -> Option<&str> {
        self.iname.as_deref()
    }

    /// Read access to the record cache, for callers building announcements.
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Apply one asset-change event and report whether the announced
    /// location is affected.
    pub fn feed(&mut self, event: AssetRecord) -> FeedOutcome {
        // inventory events lack the fields needed here
        if event.operation == AssetOperation::Inventory {
            return FeedOutcome::Ignored;
        }

        if self.iname.is_none() {
            if identity::is_rack_controller(&event)
                && identity::has_local_address(&event, &(self.local_addresses)())
            {
                info!("identified local rack controller as {}", event.name);
                self.iname = Some(event.name.clone());
                // fall through: the event doubles as the first self record
            } else {
                // any asset seen before identification is a possible ancestor
                self.cache.update(event.name.clone(), event);
                return FeedOutcome::Ignored;
            }
        }

        if self.iname.as_deref() == Some(event.name.as_str()) {
            // an update to ourselves, trigger recomputation
            self.cache.update(event.name.clone(), event);
            let chain = self.resolve_chain();
            if chain.is_empty() {
                debug!("topology no longer resolvable after self update");
                self.state = ResolverState::Discovering;
                return FeedOutcome::Unresolved;
            }
            return FeedOutcome::Changed;
        }

        match self.state {
            ResolverState::Discovering => {
                // every asset except ourselves is a possible ancestor
                self.cache.update(event.name.clone(), event);
                let chain = self.resolve_chain();
                if chain.is_empty() {
                    return FeedOutcome::Unresolved;
                }
                debug!("topology resolved ({} ancestors)", chain.len());
                self.state = ResolverState::UpToDate;
                self.purge(&chain);
                FeedOutcome::Changed
            }
            ResolverState::UpToDate => {
                if !self.cache.contains(&event.name) {
                    return FeedOutcome::Ignored;
                }
                // an update to an asset on our chain, trigger recomputation
                self.cache.update(event.name.clone(), event);
                let chain = self.resolve_chain();
                if chain.is_empty() {
                    debug!("topology no longer resolvable, back to discovery");
                    self.state = ResolverState::Discovering;
                    return FeedOutcome::Unresolved;
                }
                FeedOutcome::Changed
            }
        }
    }

    /// Ordered ancestor chain of internal names, root-most first; empty
    /// means the topology is currently unknown.
    ///
    /// Ancestor names come from the flattened `parent_name.1..N` aux
    /// attributes of the self record, not from per-node parent links.
    /// Uncached ancestors are fetched from the directory; any lookup
    /// failure discards the partial chain, while records already fetched
    /// stay cached for the next attempt.
    pub fn resolve_chain(&mut self) -> Vec<String> {
        let Some(iname) = self.iname.clone() else {
            return Vec::new();
        };

        let parents: Vec<String> = {
            let Some(record) = self.cache.lookup(&iname) else {
                return Vec::new();
            };
            (1..=MAX_ANCESTOR_LEVELS)
                .map_while(|level| record.parent_at(level).map(str::to_string))
                .collect()
        };

        let mut chain: Vec<String> = Vec::new();
        for parent in parents {
            if !self.cache.contains(&parent) {
                let Some(directory) = self.directory.as_mut() else {
                    debug!("{parent} not cached and no directory connection");
                    return Vec::new();
                };
                match directory.lookup(&parent) {
                    Ok(record) => self.cache.update(parent.clone(), record),
                    Err(err) => {
                        warn!("directory lookup for {parent} failed: {err}");
                        return Vec::new();
                    }
                }
            }
            chain.insert(0, parent);
        }
        chain
    }

    /// Friendly-name path of the ancestor chain, joined with `separator`;
    /// `None` while the topology is unknown.
    pub fn ancestor_path(&mut self, separator: &str) -> Option<String> {
        let chain = self.resolve_chain();
        if chain.is_empty() {
            return None;
        }

        let names: Vec<&str> = chain
            .iter()
            .map(|iname| {
                self.cache
                    .lookup(iname)
                    .and_then(|record| record.ext_str("name"))
                    .unwrap_or("")
            })
            .collect();
        Some(names.join(separator))
    }

    /// URI of the local device's asset record.
    pub fn self_uri(&self) -> Option<String> {
        self.iname
            .as_deref()
            .map(|iname| format!("{ASSET_URI_PREFIX}/{iname}"))
    }

    /// URI of the immediate parent's asset record.
    pub fn parent_uri(&self) -> Option<String> {
        self.self_record()?
            .parent_at(1)
            .map(|parent| format!("{ASSET_URI_PREFIX}/{parent}"))
    }

    /// User-friendly name of the local device.
    pub fn display_name(&self) -> Option<&str> {
        self.self_record()?.ext_str("name")
    }

    pub fn description(&self) -> Option<&str> {
        self.self_record()?.ext_str("description")
    }

    pub fn contact(&self) -> Option<&str> {
        self.self_record()?.ext_str("contact_email")
    }

    fn self_record(&self) -> Option<&AssetRecord> {
        self.cache.lookup(self.iname.as_deref()?)
    }

    /// Drop every cached record that is neither ourselves nor on the
    /// resolved chain.
    fn purge(&mut self, chain: &[String]) {
        let iname = self.iname.clone();
        self.cache
            .retain(|name| iname.as_deref() == Some(name) || chain.iter().any(|c| c.as_str() == name));
        debug!("cache purged down to {} records", self.cache.len());
    }
}

impl Default for TopologyResolver {
    fn default() -> Self {
        Self::new()
    }
}
