//! Query cache with tag-based invalidation.
//!
//! Entries live in a `moka` cache keyed by [`Descriptor`]; concurrent
//! queries for one descriptor share a single fetch via `try_get_with`.
//! Beside it sits an explicit tag index (`tag -> descriptors`) that
//! `invalidate` walks to mark entries stale.
//!
//! Every invalidation also bumps a per-tag epoch. A fetch records the clock
//! when it starts; if any of its tags were invalidated while it was in
//! flight, the entry is stored already stale, so the next read refetches
//! instead of serving pre-mutation data. Epochs no in-flight fetch can
//! observe are pruned, so the map stays bounded by the invalidations that
//! overlap a running fetch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use moka::future::Cache;
use moka::ops::compute::Op;
use storefront_core::{Category, DocumentId, Product, ProductPage};
use tracing::debug;

use super::queries::ProductQuery;
use crate::config::CacheConfig;
use crate::error::ApiError;

/// Attempts at obtaining a fresh entry before serving what we have.
const MAX_FETCH_ATTEMPTS: usize = 3;

// =============================================================================
// Descriptors and tags
// =============================================================================

/// Canonical identity of one API query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// A filtered page of products.
    ProductList(ProductQuery),
    /// One product by document ID.
    Product(DocumentId),
    /// All categories.
    Categories,
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProductList(query) => write!(f, "products:list:{query}"),
            Self::Product(id) => write!(f, "products:item:{id}"),
            Self::Categories => f.write_str("categories:list"),
        }
    }
}

/// Resource family a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Products,
    Categories,
}

impl TagKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "Products",
            Self::Categories => "Categories",
        }
    }
}

/// Invalidation label attached to cache entries.
///
/// Renders as `Products`, `Products:LIST` or `Products:7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Every entry of a kind.
    Kind(TagKind),
    /// List queries of a kind.
    List(TagKind),
    /// Entries containing one item, by numeric ID.
    Item(TagKind, i32),
}

impl Tag {
    /// Tag for list queries of products.
    pub const PRODUCTS_LIST: Self = Self::List(TagKind::Products);
    /// Tag for list queries of categories.
    pub const CATEGORIES_LIST: Self = Self::List(TagKind::Categories);

    /// Item tag for a product.
    #[must_use]
    pub const fn product(id: storefront_core::ProductId) -> Self {
        Self::Item(TagKind::Products, id.as_i32())
    }

    /// Kind this tag belongs to.
    #[must_use]
    pub const fn kind(&self) -> TagKind {
        match self {
            Self::Kind(kind) | Self::List(kind) | Self::Item(kind, _) => *kind,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => f.write_str(kind.as_str()),
            Self::List(kind) => write!(f, "{}:LIST", kind.as_str()),
            Self::Item(kind, id) => write!(f, "{}:{id}", kind.as_str()),
        }
    }
}

/// Error parsing a [`Tag`] from its string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache tag: {0}")]
pub struct ParseTagError(String);

impl FromStr for Tag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s.split_once(':').map_or((s, None), |(k, r)| (k, Some(r)));
        let kind = match kind {
            "Products" => TagKind::Products,
            "Categories" => TagKind::Categories,
            _ => return Err(ParseTagError(s.to_string())),
        };
        match rest {
            None => Ok(Self::Kind(kind)),
            Some("LIST") => Ok(Self::List(kind)),
            Some(id) => id
                .parse()
                .map(|id| Self::Item(kind, id))
                .map_err(|_| ParseTagError(s.to_string())),
        }
    }
}

// =============================================================================
// Cached values
// =============================================================================

/// Payload stored per descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Products(ProductPage),
    Product(Box<Product>),
    Categories(Vec<Category>),
}

impl CacheValue {
    /// Tags this payload provides.
    ///
    /// A list page is tagged with its collection tag plus one tag per item;
    /// a detail payload with its item tag.
    #[must_use]
    pub fn provides_tags(&self) -> Vec<Tag> {
        match self {
            Self::Products(page) => std::iter::once(Tag::PRODUCTS_LIST)
                .chain(page.products.iter().map(|p| Tag::product(p.id)))
                .collect(),
            Self::Product(product) => vec![Tag::product(product.id)],
            Self::Categories(categories) => std::iter::once(Tag::CATEGORIES_LIST)
                .chain(
                    categories
                        .iter()
                        .map(|c| Tag::Item(TagKind::Categories, c.id.as_i32())),
                )
                .collect(),
        }
    }
}

/// A stored payload with its tags and freshness flag.
#[derive(Debug)]
pub struct CacheEntry {
    value: CacheValue,
    tags: Vec<Tag>,
    fresh: AtomicBool,
}

impl CacheEntry {
    /// Cached payload.
    #[must_use]
    pub const fn value(&self) -> &CacheValue {
        &self.value
    }

    /// Tags the entry is indexed under, including its kind-wide tag.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Whether no matching invalidation has happened since the fetch began.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    fn mark_stale(&self) {
        self.fresh.store(false, Ordering::Release);
    }
}

/// A cached payload read without fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub value: CacheValue,
    pub fresh: bool,
}

// =============================================================================
// Tag index
// =============================================================================

#[derive(Debug, Default)]
struct TagIndex {
    by_tag: HashMap<Tag, HashSet<Descriptor>>,
    live: HashMap<Descriptor, Arc<CacheEntry>>,
    epochs: HashMap<Tag, u64>,
    /// Start clocks of fetches still running, with how many share each.
    in_flight: BTreeMap<u64, usize>,
    clock: u64,
}

impl TagIndex {
    /// Index a freshly fetched payload, deciding its freshness against any
    /// invalidations that landed after `started`.
    fn register(&mut self, descriptor: Descriptor, value: CacheValue, started: u64) -> Arc<CacheEntry> {
        let mut tags = value.provides_tags();
        if let Some(kind) = tags.first().map(Tag::kind) {
            tags.push(Tag::Kind(kind));
        }

        let fresh = tags
            .iter()
            .all(|tag| self.epochs.get(tag).is_none_or(|epoch| *epoch <= started));

        self.unlink(&descriptor);
        for tag in &tags {
            self.by_tag.entry(*tag).or_default().insert(descriptor.clone());
        }
        let entry = Arc::new(CacheEntry {
            value,
            tags,
            fresh: AtomicBool::new(fresh),
        });
        self.live.insert(descriptor, Arc::clone(&entry));
        entry
    }

    /// Drop `descriptor` from the index.
    fn unlink(&mut self, descriptor: &Descriptor) {
        let Some(entry) = self.live.remove(descriptor) else {
            return;
        };
        for tag in &entry.tags {
            if let Some(descriptors) = self.by_tag.get_mut(tag) {
                descriptors.remove(descriptor);
                if descriptors.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    /// Drop `descriptor` only if it still points at `entry`.
    fn unlink_if_current(&mut self, descriptor: &Descriptor, entry: &Arc<CacheEntry>) {
        if self
            .live
            .get(descriptor)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            self.unlink(descriptor);
        }
    }

    /// Mark every entry sharing a tag with `tags` stale; returns how many
    /// entries were affected.
    fn invalidate(&mut self, tags: &[Tag]) -> usize {
        self.clock += 1;
        let mut affected = HashSet::new();
        for tag in tags {
            self.epochs.insert(*tag, self.clock);
            if let Some(descriptors) = self.by_tag.get(tag) {
                affected.extend(descriptors.iter().cloned());
            }
        }
        for descriptor in &affected {
            if let Some(entry) = self.live.get(descriptor) {
                entry.mark_stale();
            }
        }
        self.prune_epochs();
        affected.len()
    }

    fn begin_fetch(&mut self) -> u64 {
        *self.in_flight.entry(self.clock).or_default() += 1;
        self.clock
    }

    fn end_fetch(&mut self, started: u64) {
        if let Some(count) = self.in_flight.get_mut(&started) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(&started);
            }
        }
        self.prune_epochs();
    }

    /// Forget epochs at or before the oldest running fetch's start; a
    /// missing epoch then reads as "not invalidated since" for every fetch.
    fn prune_epochs(&mut self) {
        match self.in_flight.keys().next().copied() {
            None => self.epochs.clear(),
            Some(oldest) => self.epochs.retain(|_, epoch| *epoch > oldest),
        }
    }
}

/// A running fetch's claim on the epochs it may still need.
///
/// Released on drop, so failed and cancelled fetches let go too.
struct FetchTicket {
    index: SharedIndex,
    started: u64,
}

impl FetchTicket {
    fn begin(index: SharedIndex) -> Self {
        let started = index.lock().begin_fetch();
        Self { index, started }
    }

    fn register(&self, descriptor: Descriptor, value: CacheValue) -> Arc<CacheEntry> {
        self.index.lock().register(descriptor, value, self.started)
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.index.lock().end_fetch(self.started);
    }
}

#[derive(Debug, Clone, Default)]
struct SharedIndex(Arc<Mutex<TagIndex>>);

impl SharedIndex {
    fn lock(&self) -> MutexGuard<'_, TagIndex> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// QueryCache
// =============================================================================

/// Descriptor-keyed response cache with tag invalidation.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<Descriptor, Arc<CacheEntry>>,
    index: SharedIndex,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.entry_count())
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    /// Create a cache with the given capacity and idle TTL.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let index = SharedIndex::default();
        let listener_index = index.clone();

        let entries = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_idle(config.ttl)
            .eviction_listener(move |descriptor: Arc<Descriptor>, entry: Arc<CacheEntry>, cause| {
                debug!(descriptor = %descriptor, ?cause, "Cache entry evicted");
                listener_index.lock().unlink_if_current(&descriptor, &entry);
            })
            .build();

        Self { entries, index }
    }

    /// Return the cached payload for `descriptor`, fetching it if absent or
    /// stale.
    ///
    /// Concurrent calls for the same descriptor share one `fetch`. A failed
    /// fetch is not cached and its error reaches every waiting caller.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fetch` produced.
    pub async fn query<F, Fut>(&self, descriptor: &Descriptor, fetch: F) -> Result<CacheValue, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<CacheValue, ApiError>>,
    {
        let mut latest = None;
        for _ in 0..MAX_FETCH_ATTEMPTS {
            if let Some(entry) = self.entries.get(descriptor).await {
                if entry.is_fresh() {
                    debug!(descriptor = %descriptor, "Cache hit");
                    return Ok(entry.value.clone());
                }
                debug!(descriptor = %descriptor, "Cache entry stale, refetching");
                self.remove_if_same(descriptor, &entry).await;
            } else {
                debug!(descriptor = %descriptor, "Cache miss");
            }

            let index = self.index.clone();
            let key = descriptor.clone();
            let fut = fetch();
            let entry = self
                .entries
                .try_get_with(descriptor.clone(), async move {
                    let ticket = FetchTicket::begin(index);
                    let value = fut.await?;
                    Ok::<_, ApiError>(ticket.register(key, value))
                })
                .await
                .map_err(Arc::unwrap_or_clone)?;

            if entry.is_fresh() {
                return Ok(entry.value.clone());
            }
            // Invalidated while in flight; try again so the caller doesn't
            // see data from before the mutation.
            latest = Some(entry);
        }

        debug!(descriptor = %descriptor, "Serving entry invalidated during fetch");
        latest
            .map(|entry| entry.value.clone())
            .ok_or_else(|| ApiError::Decode(format!("no cache entry for {descriptor}")))
    }

    /// Evict `descriptor` only while it still holds `stale`.
    async fn remove_if_same(&self, descriptor: &Descriptor, stale: &Arc<CacheEntry>) {
        self.entries
            .entry_by_ref(descriptor)
            .and_compute_with(|current| {
                let op = match current {
                    Some(current) if Arc::ptr_eq(current.value(), stale) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }

    /// Mark every entry tagged with any of `tags` stale.
    ///
    /// Returns how many cached entries were marked.
    pub fn invalidate(&self, tags: &[Tag]) -> usize {
        let affected = self.index.lock().invalidate(tags);
        debug!(
            tags = %tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            affected,
            "Invalidated cache tags"
        );
        affected
    }

    /// Read the cached payload and its freshness without fetching.
    pub async fn peek(&self, descriptor: &Descriptor) -> Option<Snapshot> {
        self.entries.get(descriptor).await.map(|entry| Snapshot {
            value: entry.value.clone(),
            fresh: entry.is_fresh(),
        })
    }

    /// Descriptors currently indexed under `tag`.
    #[must_use]
    pub fn descriptors_for(&self, tag: Tag) -> Vec<Descriptor> {
        self.index
            .lock()
            .by_tag
            .get(&tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        let mut index = self.index.lock();
        index.by_tag.clear();
        index.live.clear();
    }
}
