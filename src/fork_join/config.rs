use std::num::NonZeroUsize;
use std::thread;

/// Smallest number of elements a reduction hands to one thread.
pub const DEFAULT_MIN_BLOCK_SIZE: usize = 25;

/// Partitions shorter than this are sorted without spawning.
pub const DEFAULT_SORT_THRESHOLD: usize = 2048;

/// Tuning knobs of a [`ForkJoinExecutor`](super::ForkJoinExecutor).
///
/// Zero is never a meaningful value for any of them, so setters clamp it to 1.
///
/// ```
/// use joinkit::ForkJoinConfig;
///
/// let config = ForkJoinConfig::default()
///     .with_max_threads(4)
///     .with_sort_threshold(64);
/// assert_eq!(config.max_threads(), 4);
/// assert_eq!(config.max_outstanding_tasks(), 4);
/// assert_eq!(config.min_block_size(), 25);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkJoinConfig {
    min_block_size: usize,
    max_threads: usize,
    sort_threshold: usize,
    max_outstanding_tasks: Option<usize>,
}

impl Default for ForkJoinConfig {
    fn default() -> Self {
        Self {
            min_block_size: DEFAULT_MIN_BLOCK_SIZE,
            max_threads: hardware_threads(),
            sort_threshold: DEFAULT_SORT_THRESHOLD,
            max_outstanding_tasks: None,
        }
    }
}

/// Number of threads the hardware runs in parallel, or 2 if that can't be determined.
pub fn hardware_threads() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(2)
}

impl ForkJoinConfig {
    /// Sets the minimum number of elements per reduction block.
    pub fn with_min_block_size(self, min_block_size: usize) -> Self {
        Self {
            min_block_size: min_block_size.max(1),
            ..self
        }
    }

    /// Sets the maximum number of threads a reduction runs on, the calling thread included.
    pub fn with_max_threads(self, max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            ..self
        }
    }

    /// Sets the partition size below which sorting stops spawning tasks.
    pub fn with_sort_threshold(self, sort_threshold: usize) -> Self {
        Self {
            sort_threshold: sort_threshold.max(1),
            ..self
        }
    }

    /// Sets how many spawned sort tasks may be outstanding at once.
    ///
    /// Defaults to [`ForkJoinConfig::max_threads`].
    pub fn with_max_outstanding_tasks(self, max_outstanding_tasks: usize) -> Self {
        Self {
            max_outstanding_tasks: Some(max_outstanding_tasks.max(1)),
            ..self
        }
    }

    /// Minimum number of elements per reduction block.
    pub fn min_block_size(&self) -> usize {
        self.min_block_size
    }

    /// Maximum number of threads a reduction runs on.
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Partition size below which sorting stops spawning tasks.
    pub fn sort_threshold(&self) -> usize {
        self.sort_threshold
    }

    /// Maximum number of outstanding spawned sort tasks.
    pub fn max_outstanding_tasks(&self) -> usize {
        self.max_outstanding_tasks.unwrap_or(self.max_threads)
    }
}
