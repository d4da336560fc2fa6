//! Observers notified as a transfer advances.
//!
//! Callbacks only watch: they see each update after the chunk it describes
//! has been committed, and they have no way to stop the transfer. Dropping
//! the transfer future is how a caller gives up.

use std::marker::PhantomData;

/// Receiver of progress updates of type `T`.
pub trait ProgressCallback<T>: Send + Sync {
    /// Handle one update. Called from the task driving the transfer, so it
    /// should return quickly.
    fn on_progress(&self, progress: &T);
}

/// Adapter turning a closure into a `ProgressCallback`.
pub struct FnProgress<F, T> {
    callback: F,
    _update: PhantomData<fn(&T)>,
}

impl<F, T> ProgressCallback<T> for FnProgress<F, T>
where
    F: Fn(&T) + Send + Sync,
{
    fn on_progress(&self, progress: &T) {
        (self.callback)(progress)
    }
}

/// Wrap `f` so it can be passed wherever a `&dyn ProgressCallback<T>` is taken.
///
/// # Example
///
/// ```
/// use rusty_drive_common::{progress_fn, ProgressCallback};
///
/// let printer = progress_fn(|percent: &u8| println!("{}%", percent));
/// printer.on_progress(&50);
/// ```
pub fn progress_fn<F, T>(f: F) -> FnProgress<F, T>
where
    F: Fn(&T) + Send + Sync,
{
    FnProgress {
        callback: f,
        _update: PhantomData,
    }
}
