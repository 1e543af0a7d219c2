use super::error::EngineError;

/// A thread pool owned by a single refinement or scoring call and torn down with it.
///
/// Without the `parallel` feature the pool runs everything on the calling thread.
pub struct WorkerPool {
    workers: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        let workers = workers.max(1);

        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("noah-worker-{}", i))
            .build()
            .map_err(|e| EngineError::WorkerPool {
                workers,
                reason: e.to_string(),
            })?;

        Ok(Self {
            workers,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `op` inside the pool; parallel iterators started by `op` use its threads.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            self.pool.install(op)
        }
        #[cfg(not(feature = "parallel"))]
        {
            op()
        }
    }
}
