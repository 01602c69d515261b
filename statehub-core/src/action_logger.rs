//! Action logging with pattern-based filtering and in-memory storage
//!
//! [`ActionLoggerMiddleware`] logs every reduction that passes its glob
//! filter to `tracing`, and can additionally keep the most recent entries in
//! a shared ring buffer ([`ActionLog`]) that stays readable while the store
//! is running.
//!
//! # Example
//!
//! ```ignore
//! use statehub_core::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! // Log everything except Tick and Render (tracing only)
//! let logger = ActionLoggerMiddleware::new(ActionLoggerConfig::default());
//!
//! // Keep the last 100 entries in memory as well
//! let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
//! let log = logger.log_handle().unwrap();
//!
//! let store = Store::builder(AppState::default())
//!     .reducer(reducer)
//!     .middleware(logger)
//!     .build()?;
//!
//! for entry in log.lock().unwrap().recent(10) {
//!     println!("{} {}", entry.sequence, entry.summary);
//! }
//! ```

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::action::ActionSummary;
use crate::middleware::Middleware;
use crate::reducer::{ReduceResult, Reducer};

/// Configuration for action logging with glob pattern filtering.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

fn default_excludes() -> Vec<String> {
    vec!["Tick".to_string(), "Render".to_string()]
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            // High-frequency actions are noise by default
            exclude_patterns: default_excludes(),
        }
    }
}

impl ActionLoggerConfig {
    /// Create a new config from comma-separated pattern strings
    ///
    /// `None` for `include` logs everything; `None` for `exclude` keeps the
    /// default excludes (`Tick`, `Render`).
    ///
    /// # Example
    /// ```
    /// use statehub_core::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Todo*,Reset"), Some("TodoTick"));
    /// assert!(config.should_log("TodoAdd"));
    /// assert!(config.should_log("Reset"));
    /// assert!(!config.should_log("TodoTick"));
    /// assert!(!config.should_log("Filter"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_else(default_excludes),
        }
    }

    /// Create a config with specific pattern vectors
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// A config that logs every action
    pub fn all() -> Self {
        Self::with_patterns(Vec::new(), Vec::new())
    }

    /// Check if an action name should be logged based on include/exclude patterns
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

/// What happened to a logged action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The reducer produced a new state
    Reduced,
    /// The reducer failed; state was left unchanged
    Failed,
}

/// An entry in the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    /// Action name (from Action::name())
    pub name: &'static str,
    /// Summary representation (from ActionSummary::summary())
    pub summary: String,
    /// Timestamp when the action entered the reducer chain
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Set once the wrapped reducer returns
    pub outcome: Option<ActionOutcome>,
}

impl ActionLogEntry {
    /// Create a new log entry
    pub fn new(name: &'static str, summary: String, sequence: u64) -> Self {
        Self {
            name,
            summary,
            timestamp: Instant::now(),
            sequence,
            outcome: None,
        }
    }

    /// Time since this action was logged
    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }

    /// Format the elapsed time for display (e.g., "2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
    /// Which actions are recorded
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    /// Create with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Create with custom capacity and filter
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// In-memory ring buffer of recent actions
///
/// Older entries are discarded once capacity is reached.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    /// Create a new action log with configuration
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Record an action if it passes the filter
    ///
    /// Returns the entry's sequence number, or `None` if it was filtered out.
    pub fn record<A: ActionSummary>(&mut self, action: &A) -> Option<u64> {
        let name = action.name();
        if self.config.capacity == 0 || !self.config.filter.should_log(name) {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(ActionLogEntry::new(name, action.summary(), sequence));
        Some(sequence)
    }

    /// Set the outcome of a recorded entry
    ///
    /// No-op if the entry has already been evicted.
    pub fn set_outcome(&mut self, sequence: u64, outcome: ActionOutcome) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.sequence == sequence)
        {
            entry.outcome = Some(outcome);
        }
    }

    /// Get all entries (oldest first)
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Get the most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get configuration
    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

/// Shared handle to an [`ActionLog`]
pub type SharedActionLog = Arc<Mutex<ActionLog>>;

fn lock_log(log: &SharedActionLog) -> MutexGuard<'_, ActionLog> {
    // A panic while holding the lock only ever leaves a partially written
    // ring buffer behind, which is still readable.
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Middleware that logs actions with configurable pattern filtering.
///
/// Supports two modes:
/// - **Tracing only** (default): logs via `tracing::debug!()`
/// - **With storage**: also records entries in a shared [`ActionLog`]
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<SharedActionLog>,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Create a new action logger middleware with tracing only
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            active: true,
        }
    }

    /// Create middleware with in-memory storage
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(Arc::new(Mutex::new(ActionLog::new(config)))),
            active: true,
        }
    }

    /// Create with default config and in-memory storage
    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// Create with no filtering (logs all actions), tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::all())
    }

    /// Set whether the middleware is active.
    ///
    /// An inactive logger returns the wrapped reducer untouched.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check if the middleware is active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Shared handle to the action log (if storage is enabled)
    pub fn log_handle(&self) -> Option<SharedActionLog> {
        self.log.clone()
    }

    /// Get a reference to the config
    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl<S, A> Middleware<S, A> for ActionLoggerMiddleware
where
    S: 'static,
    A: ActionSummary,
{
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A> {
        if !self.active {
            return next;
        }

        let config = self.config.clone();
        let log = self.log.clone();
        Arc::new(move |action: &A, state: &S| -> ReduceResult<S> {
            let name = action.name();
            if config.should_log(name) {
                tracing::debug!(action = %name, "action");
            }

            let sequence = log.as_ref().and_then(|log| lock_log(log).record(action));
            let Some((log, sequence)) = log.as_ref().zip(sequence) else {
                return next(action, state);
            };

            // A panicking reducer is recorded as failed, then the panic carries on
            let caught = panic::catch_unwind(AssertUnwindSafe(|| next(action, state)));
            let result = match caught {
                Ok(result) => result,
                Err(payload) => {
                    lock_log(log).set_outcome(sequence, ActionOutcome::Failed);
                    panic::resume_unwind(payload);
                }
            };

            let outcome = match result {
                Ok(_) => ActionOutcome::Reduced,
                Err(_) => ActionOutcome::Failed,
            };
            lock_log(log).set_outcome(sequence, outcome);
            result
        })
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                // Let the last star swallow one more character
                Some((star_pi, star_ti)) => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    backtrack = Some((star_pi, star_ti + 1));
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::ComposedMiddleware;
    use crate::reducer;
    use crate::{Action, ReducerError};

    #[test]
    fn test_glob_match() {
        assert!(glob_match("Tick", "Tick"));
        assert!(!glob_match("Tick", "TickTock"));

        assert!(glob_match("Todo*", "TodoAdd"));
        assert!(glob_match("Todo*", "Todo"));
        assert!(!glob_match("Todo*", "AddTodo"));
        assert!(glob_match("*Todo", "AddTodo"));
        assert!(glob_match("*Todo*", "AddTodoLater"));

        assert!(glob_match("Tick?", "Ticks"));
        assert!(!glob_match("Tick?", "Tick"));

        assert!(glob_match("Add*Todo*", "AddBigTodoNow"));
        assert!(glob_match("**", ""));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = ActionLoggerConfig::new(Some("Did*"), Some("DidFail*"));
        assert!(config.should_log("DidLoad"));
        assert!(!config.should_log("DidFailLoad"));
        assert!(!config.should_log("Load"));
    }

    #[test]
    fn test_config_defaults_exclude_noise() {
        let config = ActionLoggerConfig::default();
        assert!(!config.should_log("Tick"));
        assert!(!config.should_log("Render"));
        assert!(config.should_log("AddTodo"));

        let config = ActionLoggerConfig::new(None, None);
        assert_eq!(config, ActionLoggerConfig::default());
    }

    #[test]
    fn test_config_ignores_empty_patterns() {
        let config = ActionLoggerConfig::new(Some(" AddTodo , ,"), Some(""));
        assert_eq!(config.include_patterns, vec!["AddTodo".to_string()]);
        assert!(config.exclude_patterns.is_empty());
        assert!(config.should_log("AddTodo"));
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Tick,
        Add(i32),
        Reject,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Tick => "Tick",
                TestAction::Add(_) => "Add",
                TestAction::Reject => "Reject",
            }
        }
    }

    impl ActionSummary for TestAction {}

    #[test]
    fn test_action_log_capacity() {
        let mut log = ActionLog::new(ActionLogConfig::new(3, ActionLoggerConfig::all()));
        for n in 0..4 {
            log.record(&TestAction::Add(n));
        }

        assert_eq!(log.len(), 3);
        // Sequence 0 was evicted
        assert_eq!(log.entries().next().unwrap().sequence, 1);

        let recent: Vec<_> = log.recent(2).map(|e| e.sequence).collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[test]
    fn test_action_log_filtering() {
        let mut log = ActionLog::default();
        assert_eq!(log.record(&TestAction::Tick), None);
        assert_eq!(log.record(&TestAction::Add(1)), Some(0));
        assert_eq!(log.entries().next().unwrap().summary, "Add(1)");
    }

    #[test]
    fn test_middleware_records_outcomes() {
        let logger = ActionLoggerMiddleware::with_default_log();
        let log = logger.log_handle().unwrap();

        let base = reducer::fallible(|action: &TestAction, state: &i32| match action {
            TestAction::Add(n) => Ok(state + n),
            TestAction::Tick => Ok(*state),
            TestAction::Reject => Err(ReducerError::rejected("no")),
        });
        let composed = ComposedMiddleware::new().with(logger).compose(base);

        assert_eq!(composed(&TestAction::Add(2), &1).unwrap(), 3);
        assert!(composed(&TestAction::Reject, &1).is_err());
        assert_eq!(composed(&TestAction::Tick, &1).unwrap(), 1);

        let log = log.lock().unwrap();
        let outcomes: Vec<_> = log.entries().map(|e| (e.name, e.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                ("Add", Some(ActionOutcome::Reduced)),
                ("Reject", Some(ActionOutcome::Failed)),
            ]
        );
    }

    #[test]
    fn test_middleware_records_panicking_reducer_as_failed() {
        let logger = ActionLoggerMiddleware::with_default_log();
        let log = logger.log_handle().unwrap();
        let composed = ComposedMiddleware::new()
            .with(logger)
            .compose(reducer::from_fn(|action: &TestAction, state: &i32| {
                match action {
                    TestAction::Reject => panic!("reducer blew up"),
                    _ => *state,
                }
            }));

        let caught = std::panic::catch_unwind(AssertUnwindSafe(|| {
            composed(&TestAction::Reject, &0)
        }));
        assert!(caught.is_err());

        let log = log.lock().unwrap();
        let entry = log.entries().next().unwrap();
        assert_eq!(entry.name, "Reject");
        assert_eq!(entry.outcome, Some(ActionOutcome::Failed));
    }

    #[test]
    fn test_inactive_logger_records_nothing() {
        let logger = ActionLoggerMiddleware::with_default_log().active(false);
        let log = logger.log_handle().unwrap();
        let composed = ComposedMiddleware::new()
            .with(logger)
            .compose(reducer::from_fn(|_: &TestAction, state: &i32| *state));

        composed(&TestAction::Add(1), &0).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_entry_elapsed_display() {
        let entry = ActionLogEntry::new("Add", "Add(1)".to_string(), 0);
        assert!(entry.elapsed_display().ends_with("ms"));
    }
}
