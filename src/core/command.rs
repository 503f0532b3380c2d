//! Command Pattern implementation for the built-in verb table
//!
//! Every built-in verb is a struct implementing the `Command` trait,
//! registered by name in the dispatcher's registry. The trait-based
//! architecture keeps verb logic out of the dispatcher and lets commands
//! carry their own flags (Cut and Copy share one implementation with a
//! `del` field, for example).

use crate::core::exec::ExecContext;
use crate::core::window::WindowRoot;

/// A built-in editor verb
///
/// `execute` receives the window root (all columns, editors, jobs), the
/// capability context of the invocation, and the raw argument string.
/// Failures are reported through `WindowRoot::warn`, never by aborting
/// the dispatcher.
pub trait Command: Send + Sync + CloneCommand {
    fn execute(&self, root: &mut WindowRoot, ec: &ExecContext, arg: &str);
}

/// Helper trait for cloning boxed commands
/// This trait is automatically implemented for all Command types
pub trait CloneCommand {
    /// Create a boxed clone of this command
    fn clone_box(&self) -> Box<dyn Command>;
}

impl<T> CloneCommand for T
where
    T: 'static + Command + Clone,
{
    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Command> {
    fn clone(&self) -> Box<dyn Command> {
        self.as_ref().clone_box()
    }
}
