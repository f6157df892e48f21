//! Operation logging with pattern-based filtering and in-memory storage
//!
//! Filters fully qualified commit and dispatch names with glob patterns, logs
//! the survivors through `tracing`, and optionally keeps them in a ring buffer
//! for inspection in tests or debug tooling.
//!
//! # Example
//!
//! ```ignore
//! use modstore_core::logger::{OperationLogConfig, OperationLoggerMiddleware};
//!
//! let middleware = OperationLoggerMiddleware::with_log(OperationLogConfig::default());
//! let log = middleware.log().unwrap();
//! let store = Store::with_middleware(StoreConfig::default(), middleware);
//!
//! // ...
//! for entry in log.lock().recent(10) {
//!     println!("{} {}", entry.elapsed_display(), entry.name);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::middleware::{Middleware, Operation, OperationKind};

/// Glob filter over operation names.
///
/// - `*` matches any sequence of characters
/// - `?` matches any single character
///
/// `test:*` matches every key of the `test:` module, `*:update*` every
/// update mutation.
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    /// If non-empty, only log names matching one of these
    pub include_patterns: Vec<String>,
    /// Skip names matching these (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl OperationFilter {
    /// Create a filter from comma-separated pattern strings
    ///
    /// ```
    /// use modstore_core::logger::OperationFilter;
    ///
    /// let filter = OperationFilter::new(Some("test:*"), Some("test:list:*"));
    /// assert!(filter.should_log("test:updateName"));
    /// assert!(!filter.should_log("test:list:testAction"));
    /// assert!(!filter.should_log("other:reset"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Check a fully qualified name against the include/exclude patterns
    pub fn should_log(&self, name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|p| glob_match(p, name))
        {
            return false;
        }
        !self.exclude_patterns.iter().any(|p| glob_match(p, name))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// An entry in the operation log
#[derive(Debug, Clone)]
pub struct OperationLogEntry {
    pub kind: OperationKind,
    /// Fully qualified mutation or action name
    pub name: String,
    /// Compact JSON of the payload
    pub payload: String,
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Outcome, set once the operation finished
    pub succeeded: Option<bool>,
}

impl OperationLogEntry {
    fn new(op: &Operation<'_>, sequence: u64) -> Self {
        Self {
            kind: op.kind,
            name: op.name.to_owned(),
            payload: op.payload.to_string(),
            timestamp: Instant::now(),
            sequence,
            succeeded: None,
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }

    /// Elapsed time for display ("2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the operation log ring buffer
#[derive(Debug, Clone)]
pub struct OperationLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
    pub filter: OperationFilter,
}

impl Default for OperationLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: OperationFilter::default(),
        }
    }
}

impl OperationLogConfig {
    pub fn new(capacity: usize, filter: OperationFilter) -> Self {
        Self { capacity, filter }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }
}

/// Entries allocated up front; larger logs grow on demand
const PREALLOCATED_ENTRIES: usize = 128;

/// In-memory ring buffer of recent operations.
///
/// Older entries are discarded once capacity is reached.
#[derive(Debug, Clone)]
pub struct OperationLog {
    entries: VecDeque<OperationLogEntry>,
    config: OperationLogConfig,
    next_sequence: u64,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new(OperationLogConfig::default())
    }
}

impl OperationLog {
    pub fn new(config: OperationLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity.min(PREALLOCATED_ENTRIES)),
            config,
            next_sequence: 0,
        }
    }

    /// Record an operation if it passes the filter
    pub fn record(&mut self, op: &Operation<'_>) -> Option<&OperationLogEntry> {
        if self.config.capacity == 0 || !self.config.filter.should_log(op.name) {
            return None;
        }

        let entry = OperationLogEntry::new(op, self.next_sequence);
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.entries.back()
    }

    /// Set the outcome of the newest unfinished entry for `op`.
    ///
    /// Actions commit while they run, so the entry to complete is not
    /// necessarily the last one.
    pub fn complete(&mut self, op: &Operation<'_>, succeeded: bool) {
        let pending = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.succeeded.is_none() && e.kind == op.kind && e.name == op.name);
        if let Some(entry) = pending {
            entry.succeeded = Some(succeeded);
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &OperationLogEntry> {
        self.entries.iter()
    }

    /// The most recent `count` entries, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &OperationLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> &OperationLogConfig {
        &self.config
    }
}

/// Log shared between the middleware (owned by the store) and its reader
pub type SharedOperationLog = Arc<Mutex<OperationLog>>;

/// Middleware that logs operations with pattern filtering.
///
/// Tracing only by default; [`with_log`](Self::with_log) also keeps entries in
/// a [`SharedOperationLog`].
#[derive(Debug, Clone)]
pub struct OperationLoggerMiddleware {
    filter: OperationFilter,
    log: Option<SharedOperationLog>,
    active: bool,
}

impl OperationLoggerMiddleware {
    /// Tracing only
    pub fn new(filter: OperationFilter) -> Self {
        Self {
            filter,
            log: None,
            active: true,
        }
    }

    /// Tracing plus in-memory storage
    pub fn with_log(config: OperationLogConfig) -> Self {
        Self {
            filter: config.filter.clone(),
            log: Some(Arc::new(Mutex::new(OperationLog::new(config)))),
            active: true,
        }
    }

    /// Log everything, tracing only
    pub fn log_all() -> Self {
        Self::new(OperationFilter::default())
    }

    /// When inactive every hook is a no-op
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The shared log, if storage is enabled
    pub fn log(&self) -> Option<SharedOperationLog> {
        self.log.clone()
    }

    pub fn filter(&self) -> &OperationFilter {
        &self.filter
    }
}

impl Middleware for OperationLoggerMiddleware {
    fn before(&self, op: &Operation<'_>) {
        if !self.active {
            return;
        }

        if self.filter.should_log(op.name) {
            tracing::debug!(kind = ?op.kind, name = %op.name, payload = %op.payload, "operation");
        }
        if let Some(log) = &self.log {
            log.lock().record(op);
        }
    }

    fn after(&self, op: &Operation<'_>, succeeded: bool) {
        if !self.active {
            return;
        }

        if !succeeded && self.filter.should_log(op.name) {
            tracing::warn!(kind = ?op.kind, name = %op.name, "operation failed");
        }
        if let Some(log) = &self.log {
            log.lock().complete(op, succeeded);
        }
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let mut pi = 0;
    let mut ti = 0;
    let mut star: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                // Let the last star swallow one more character
                Some((spi, sti)) => {
                    star = Some((spi, sti + 1));
                    pi = spi + 1;
                    ti = sti + 1;
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}
