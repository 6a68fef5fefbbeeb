//! Per-row image loading for recycled list rows.
//!
//! A list reuses its visual rows for different data as the user scrolls, so a picture requested
//! for "row 5 showing item X" may arrive when row 5 already shows item Y. Two mechanisms keep
//! the wrong picture off screen:
//!
//! * at most one load is registered per row; starting a new one, or calling [`ImageLoader::cancel`],
//!   cancels the previous one;
//! * when a load completes it re-checks a caller-supplied predicate ("is this row still showing
//!   what I was started for?") before handing the image over.
//!
//! Cancellation is cooperative and can lose a race against a completing fetch, so the predicate
//! is what guarantees correctness. [`RowBindings`] provides such predicates for the common case of
//! tagging each row with the id of the item it displays.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::image::Image;
use crate::url::Url;

/// Where the loader gets its pictures from
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load_image(&self, url: &Url) -> Result<Image>;
}

/// Registration of a running load
struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

type Registry<K> = Arc<Mutex<HashMap<K, InFlight>>>;

/// Loads one image per row identity, cancelling and replacing loads as rows are reused.
///
/// Every load runs as its own task on the runtime, so loads for different rows proceed
/// concurrently. The apply callback runs on whichever worker thread completed the load.
/// A load stays registered until its apply callback has returned, so once
/// [`ImageLoader::is_loading`] turns false the row has its picture or never will.
/// Dropping the loader cancels every load still registered.
pub struct ImageLoader<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    source: Arc<dyn ImageSource>,
    loads: Registry<K>,
    next_generation: AtomicU64,
    runtime: Handle,
}

impl<K> ImageLoader<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    /// Create a loader spawning its loads on the runtime of the calling thread.
    ///
    /// Fails with `Error::NoRuntime` outside of a tokio runtime.
    pub fn new(source: Arc<dyn ImageSource>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::with_runtime(source, runtime))
    }

    pub fn with_runtime(source: Arc<dyn ImageSource>, runtime: Handle) -> Self {
        ImageLoader {
            source,
            loads: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            runtime,
        }
    }

    /// Start loading `url` for `row`, superseding any load already registered for it.
    ///
    /// Once the image is fetched and decoded, `apply` is called with it only if the load was
    /// not cancelled in the meantime and `is_current` still returns true. Failures of any kind
    /// are logged and otherwise ignored: the row simply gets no picture. The registration is
    /// removed when the load ends, however it ends, panics included.
    pub fn request_image<C, A>(&self, row: K, url: Url, is_current: C, apply: A)
    where
        C: FnOnce() -> bool + Send + 'static,
        A: FnOnce(Image) + Send + 'static,
    {
        // Held until the new load is registered, so its own cleanup cannot run first
        let mut loads = self.loads.lock();
        if let Some(previous) = loads.remove(&row) {
            debug!(?row, "superseding in-flight image load");
            previous.cancel.cancel();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        debug!(?row, %url, generation, "starting image load");

        self.runtime.spawn(run_load(
            Arc::clone(&self.source),
            Arc::clone(&self.loads),
            row.clone(),
            generation,
            url,
            cancel.clone(),
            is_current,
            apply,
        ));
        loads.insert(row, InFlight { generation, cancel });
    }

    /// Cancel the load registered for `row`, if any.
    ///
    /// Call it when a row scrolls out of view and before reconfiguring a row for new data.
    pub fn cancel(&self, row: &K) {
        if let Some(load) = self.loads.lock().remove(row) {
            debug!(?row, generation = load.generation, "cancelling image load");
            load.cancel.cancel();
        }
    }

    /// Cancel every registered load, typically when the owning list goes away
    pub fn cancel_all(&self) {
        let drained: Vec<(K, InFlight)> = self.loads.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelling all image loads");
        }
        for (_, load) in drained {
            load.cancel.cancel();
        }
    }

    pub fn is_loading(&self, row: &K) -> bool {
        self.loads.lock().contains_key(row)
    }

    /// Number of registered loads
    pub fn in_flight(&self) -> usize {
        self.loads.lock().len()
    }
}

impl<K> Drop for ImageLoader<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Body of one load task
#[allow(clippy::too_many_arguments)]
async fn run_load<K, C, A>(
    source: Arc<dyn ImageSource>,
    loads: Registry<K>,
    row: K,
    generation: u64,
    url: Url,
    cancel: CancellationToken,
    is_current: C,
    apply: A,
) where
    K: Eq + Hash + Debug,
    C: FnOnce() -> bool,
    A: FnOnce(Image),
{
    // Dropped last, even when the source or a callback panics
    let registration = Registration {
        loads,
        row,
        generation,
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = source.load_image(&url) => Some(result),
    };
    let row = &registration.row;

    match outcome {
        None => debug!(?row, %url, "image load cancelled"),
        Some(Err(err)) => debug!(?row, %url, "image load failed: {}", err),
        Some(Ok(_)) if cancel.is_cancelled() || !registration.is_active() => {
            debug!(?row, %url, "discarding image of a cancelled load")
        }
        Some(Ok(image)) => {
            if is_current() {
                apply(image);
            } else {
                debug!(?row, %url, "discarding stale image, row now shows other data");
            }
        }
    }
}

/// Registration of one load, removed from the registry on drop if it still belongs to the same
/// generation. A superseded load must not remove the load that replaced it.
struct Registration<K>
where
    K: Eq + Hash,
{
    loads: Registry<K>,
    row: K,
    generation: u64,
}

impl<K> Registration<K>
where
    K: Eq + Hash,
{
    fn is_active(&self) -> bool {
        self.loads
            .lock()
            .get(&self.row)
            .is_some_and(|load| load.generation == self.generation)
    }
}

impl<K> Drop for Registration<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let mut loads = self.loads.lock();
        if loads
            .get(&self.row)
            .is_some_and(|load| load.generation == self.generation)
        {
            loads.remove(&self.row);
        }
    }
}

/// What each row currently displays, as a tag (an item id, a snapshot version...).
///
/// [`RowBindings::is_current`] captures the tag a load is started for and yields the predicate
/// [`ImageLoader::request_image`] checks before applying.
pub struct RowBindings<K, T> {
    bindings: Arc<Mutex<HashMap<K, T>>>,
}

impl<K, T> Clone for RowBindings<K, T> {
    fn clone(&self) -> Self {
        RowBindings {
            bindings: Arc::clone(&self.bindings),
        }
    }
}

impl<K, T> Default for RowBindings<K, T> {
    fn default() -> Self {
        RowBindings {
            bindings: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> RowBindings<K, T>
where
    K: Eq + Hash + Send + 'static,
    T: PartialEq + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `row` now displays `tag`
    pub fn bind(&self, row: K, tag: T) {
        self.bindings.lock().insert(row, tag);
    }

    /// Record that `row` is no longer displayed
    pub fn unbind(&self, row: &K) {
        self.bindings.lock().remove(row);
    }

    /// Forget every row, e.g. when the list reloads
    pub fn clear(&self) {
        self.bindings.lock().clear();
    }

    /// Predicate that holds while `row` is still bound to `tag`
    pub fn is_current(&self, row: K, tag: T) -> impl FnOnce() -> bool + Send + 'static {
        let bindings = Arc::clone(&self.bindings);
        move || bindings.lock().get(&row) == Some(&tag)
    }
}
