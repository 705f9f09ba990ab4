use crate::config::ViewerConfig;
use crate::dataset::{Dataset, LoadOptions, load_dataset};
use crate::error::BudgetResult;
use crate::{log_cache_operation, log_slow_operation};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

const SLOW_LOAD_THRESHOLD_MS: u64 = 2_000;

/// Produces the dataset on a cache miss.
pub trait DatasetLoader: Send + Sync {
    fn load(&self) -> BudgetResult<Dataset>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads the configured workbook from disk.
#[derive(Debug, Clone)]
pub struct WorkbookLoader {
    options: LoadOptions,
}

impl WorkbookLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }
}

impl DatasetLoader for WorkbookLoader {
    fn load(&self) -> BudgetResult<Dataset> {
        load_dataset(&self.options)
    }

    fn describe(&self) -> String {
        self.options.path.display().to_string()
    }
}

/// Hands out clones of a dataset that was built up front.
#[derive(Debug, Clone)]
pub struct PreloadedLoader {
    dataset: Dataset,
}

impl PreloadedLoader {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

impl DatasetLoader for PreloadedLoader {
    fn load(&self) -> BudgetResult<Dataset> {
        Ok(self.dataset.clone())
    }

    fn describe(&self) -> String {
        "preloaded".to_string()
    }
}

/// Process-wide, lazily populated, read-only dataset slot.
///
/// The first `get` loads under the write lock; concurrent first callers wait on that lock and
/// then see the populated slot, so the loader runs once. Failed loads are not cached.
pub struct DatasetCache {
    loader: Box<dyn DatasetLoader>,
    slot: RwLock<Option<Arc<Dataset>>>,
    cache_ops: AtomicU64,
    cache_hits: AtomicU64,
    loads: AtomicU64,
}

impl DatasetCache {
    pub fn new(loader: Box<dyn DatasetLoader>) -> Self {
        Self {
            loader,
            slot: RwLock::new(None),
            cache_ops: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(Box::new(WorkbookLoader::new(config.load_options())))
    }

    pub fn preloaded(dataset: Dataset) -> Self {
        Self::new(Box::new(PreloadedLoader::new(dataset)))
    }

    pub fn get(&self) -> BudgetResult<Arc<Dataset>> {
        self.cache_ops.fetch_add(1, Ordering::Relaxed);
        let source = self.loader.describe();

        if let Some(dataset) = self.slot.read().as_ref() {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            log_cache_operation!(hit, source, "dataset served from cache");
            return Ok(dataset.clone());
        }

        let mut slot = self.slot.write();
        if let Some(dataset) = slot.as_ref() {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            log_cache_operation!(hit, source, "dataset loaded by concurrent caller");
            return Ok(dataset.clone());
        }

        log_cache_operation!(miss, source, "loading dataset");
        let started = Instant::now();
        let dataset = Arc::new(self.loader.load()?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        log_slow_operation!(
            started.elapsed(),
            SLOW_LOAD_THRESHOLD_MS,
            rows = dataset.len(),
            "dataset load"
        );
        info!(source = %source, rows = dataset.len(), "dataset cached");
        debug!(summary = ?dataset.summary(), "dataset summary");

        *slot = Some(dataset.clone());
        Ok(dataset)
    }

    /// Drops the cached dataset; the next `get` reloads. Returns whether anything was cached.
    pub fn invalidate(&self) -> bool {
        let evicted = self.slot.write().take().is_some();
        debug!(source = %self.loader.describe(), evicted, "dataset cache invalidated");
        evicted
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            operations: self.cache_ops.load(Ordering::Relaxed),
            hits: self.cache_hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub operations: u64,
    pub hits: u64,
    pub loads: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.hits as f64 / self.operations as f64
        }
    }
}
