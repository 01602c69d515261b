//! Action traits for serialized state transitions

use std::fmt::Debug;

/// Marker trait for actions that can be dispatched to the store
///
/// Actions describe an intended state change. The store never looks inside
/// them; they are handed to the reducer as-is. They should be:
/// - Clone: Actions may be logged, recorded for fault reports, or replayed
/// - Debug: For logging and fault reports
/// - Send + Sync + 'static: Dispatch happens from any thread and reduction
///   happens on the store's worker task
///
/// Use `#[derive(Action)]` from `statehub-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;
}

/// Human-readable one-line description of an action
///
/// Used by the action log. The default renders the `Debug` form; override
/// it for actions carrying large payloads.
pub trait ActionSummary: Action {
    /// Summary shown in action log entries
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}
