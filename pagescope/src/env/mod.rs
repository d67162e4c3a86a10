//! The environment that runs page reads and decoding off the caller's thread.

use std::future::Future;

use futures::future::BoxFuture;

mod pool;
pub use pool::Pool;

/// Provides an environment to run background tasks.
pub trait Env: Clone + Send + Sync + 'static {
    /// Spawns a task to run in the background and returns a future that
    /// resolves to its output.
    ///
    /// Dropping the returned future before the task starts cancels the task.
    /// Once the task has started it runs to completion.
    fn spawn_background<F>(&self, f: F) -> BoxFuture<'static, F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send;

    /// Spawns a task that runs to completion on its own.
    fn spawn_detached<F>(&self, f: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
