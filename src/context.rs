//! Explicit execution context for the data-parallel array kernels.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::Result;

/// Worker pool every parallel kernel of a run executes on. Created once at start-up;
/// dropping it releases the threads.
#[derive(Debug)]
pub struct ExecutionContext {
    pool: ThreadPool,
}

impl ExecutionContext {
    /// `n_threads == 0` lets rayon pick one thread per core.
    pub fn new(n_threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("kinetic-worker-{i}"))
            .build()?;
        info!(n_threads = pool.current_num_threads(), "execution context created");
        Ok(Self { pool })
    }

    /// Runs `op` with all nested `par_for_each` calls scheduled on this context.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    pub fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_install_runs_on_pool() {
        let context = ExecutionContext::new(2).unwrap();
        assert_eq!(2, context.n_threads());
        let threads = context.install(rayon::current_num_threads);
        assert_eq!(2, threads);
    }
}
