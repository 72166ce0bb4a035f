//! Workflow state abstraction for the Pregel runtime
//!
//! Vertices never mutate the state they read. They return a partial update
//! and the runtime folds it into a fresh state at the end of the superstep.

use super::vertex::StateUpdate;

/// State threaded through the superstep runtime
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Default)]
/// struct CounterState {
///     count: i32,
///     done: bool,
/// }
///
/// impl WorkflowState for CounterState {
///     type Update = CounterUpdate;
///
///     fn apply_update(&self, update: Self::Update) -> Self {
///         Self {
///             count: self.count + update.delta,
///             done: update.done.unwrap_or(self.done),
///         }
///     }
///
///     fn is_terminal(&self) -> bool {
///         self.done
///     }
/// }
/// ```
pub trait WorkflowState: Clone + Send + Sync + 'static {
    /// Partial change a vertex returns
    type Update: StateUpdate;

    /// Merge `update` into a copy of `self`; `self` is left untouched.
    fn apply_update(&self, update: Self::Update) -> Self;

    /// Stop condition checked after every superstep
    ///
    /// When true, the runtime stops after the current superstep regardless
    /// of outgoing edges.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Apply several updates in order
    fn apply_updates(&self, updates: Vec<Self::Update>) -> Self {
        updates
            .into_iter()
            .fold(self.clone(), |state, update| state.apply_update(update))
    }
}

/// A unit state for graphs that only exercise routing
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UnitState;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UnitUpdate;

impl StateUpdate for UnitUpdate {
    fn empty() -> Self {
        UnitUpdate
    }

    fn is_empty(&self) -> bool {
        true
    }
}

impl WorkflowState for UnitState {
    type Update = UnitUpdate;

    fn apply_update(&self, _update: Self::Update) -> Self {
        UnitState
    }
}
