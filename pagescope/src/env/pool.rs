use std::{future::Future, io::Result};

use futures::{
    executor::ThreadPool,
    future::{BoxFuture, FutureExt},
};

use super::Env;

/// An implementation of [`Env`] backed by a fixed number of worker threads.
#[derive(Clone, Debug)]
pub struct Pool(ThreadPool);

impl Pool {
    /// Creates a pool with `threads` workers.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPool::builder()
            .pool_size(threads)
            .name_prefix("pagescope-worker-")
            .create()?;
        Ok(Self(pool))
    }
}

impl Env for Pool {
    fn spawn_background<F>(&self, f: F) -> BoxFuture<'static, F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        // The remote half checks for a dropped handle before polling `f`.
        let (task, handle) = f.remote_handle();
        self.0.spawn_ok(task);
        handle.boxed()
    }

    fn spawn_detached<F>(&self, f: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.0.spawn_ok(f);
    }
}
