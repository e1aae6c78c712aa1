//! Execution engines for controlling computation strategy
//!
//! Resampling work (bootstrap refits, permutation refits, per-group fits) is
//! embarrassingly parallel: every task receives its own index and seed and
//! returns a value. An execution engine decides whether those tasks run on
//! the calling thread or on a dedicated Rayon pool.
//!
//! # Design Philosophy
//!
//! - **Unified Control**: One type decides sequential vs parallel dispatch
//! - **Thread Pool Integration**: Parallel engines own a sized Rayon pool
//! - **Hierarchical Control**: Prevents thread oversubscription in nested operations

#[cfg(feature = "parallel")]
use crate::Error;
use crate::Result;
use tracing::debug;

/// Execution strategy for batch operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Process items sequentially
    Sequential,
    /// Process items in parallel
    Parallel,
}

/// Trait for execution engines that control how batches are dispatched
pub trait ExecutionEngine: Clone + Send + Sync {
    /// Execute `count` independent tasks, returning results in task order
    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send;

    /// Get the execution strategy
    fn strategy(&self) -> ExecutionStrategy;

    /// Check if parallel execution is available
    fn is_parallel(&self) -> bool {
        self.strategy() == ExecutionStrategy::Parallel
    }

    /// Get the number of threads available
    fn num_threads(&self) -> usize;
}

/// Extension trait for hierarchical execution control
///
/// Nested work (a refit inside a bootstrap task, a first-level fit inside a
/// grouped batch) must not spawn more workers. Engines hand out a
/// subordinate engine for that inner work.
pub trait HierarchicalExecution: ExecutionEngine {
    /// The type of subordinate engine this engine creates
    type SubordinateEngine: ExecutionEngine;

    /// Create a subordinate engine for nested operations
    fn subordinate(&self) -> Self::SubordinateEngine;
}

/// Sequential execution engine
///
/// Executes all operations sequentially in the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    /// Create a new sequential engine
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionEngine for SequentialEngine {
    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        (0..count).map(f).collect()
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Sequential
    }

    fn num_threads(&self) -> usize {
        1
    }
}

impl HierarchicalExecution for SequentialEngine {
    type SubordinateEngine = SequentialEngine;

    fn subordinate(&self) -> Self::SubordinateEngine {
        *self
    }
}

/// Parallel execution engine using Rayon
///
/// Executes operations in parallel using Rayon's thread pool.
#[cfg(feature = "parallel")]
#[derive(Clone, Debug)]
pub struct ParallelEngine {
    thread_pool: Option<std::sync::Arc<rayon::ThreadPool>>,
}

#[cfg(feature = "parallel")]
impl ParallelEngine {
    /// Create a new parallel engine with the global thread pool
    pub fn new() -> Self {
        Self { thread_pool: None }
    }

    /// Create with a specific number of threads
    pub fn with_num_threads(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| Error::Execution(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            thread_pool: Some(std::sync::Arc::new(pool)),
        })
    }
}

#[cfg(feature = "parallel")]
impl Default for ParallelEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "parallel")]
impl ExecutionEngine for ParallelEngine {
    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        use rayon::prelude::*;

        if let Some(pool) = &self.thread_pool {
            pool.install(|| (0..count).into_par_iter().map(f).collect())
        } else {
            (0..count).into_par_iter().map(f).collect()
        }
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Parallel
    }

    fn num_threads(&self) -> usize {
        if let Some(pool) = &self.thread_pool {
            pool.current_num_threads()
        } else {
            rayon::current_num_threads()
        }
    }
}

#[cfg(feature = "parallel")]
impl HierarchicalExecution for ParallelEngine {
    type SubordinateEngine = SequentialEngine;

    fn subordinate(&self) -> Self::SubordinateEngine {
        SequentialEngine
    }
}

/// Engine selected at runtime from a worker count
#[derive(Clone, Debug)]
pub enum Engine {
    Sequential(SequentialEngine),
    #[cfg(feature = "parallel")]
    Parallel(ParallelEngine),
}

impl Engine {
    /// Build an engine for `n_jobs` workers
    ///
    /// `1` runs on the calling thread, `0` uses every available core and any
    /// other value builds a dedicated pool of that size.
    pub fn from_jobs(n_jobs: usize) -> Result<Self> {
        if n_jobs == 1 {
            return Ok(Engine::Sequential(SequentialEngine));
        }

        #[cfg(feature = "parallel")]
        {
            let engine = if n_jobs == 0 {
                ParallelEngine::new()
            } else {
                ParallelEngine::with_num_threads(n_jobs)?
            };
            debug!("Using parallel engine with {} threads", engine.num_threads());
            Ok(Engine::Parallel(engine))
        }
        #[cfg(not(feature = "parallel"))]
        {
            debug!(
                "n_jobs = {} requested without the `parallel` feature; running sequentially",
                n_jobs
            );
            Ok(Engine::Sequential(SequentialEngine))
        }
    }

    /// Sequential engine on the calling thread
    pub fn sequential() -> Self {
        Engine::Sequential(SequentialEngine)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::sequential()
    }
}

impl ExecutionEngine for Engine {
    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        match self {
            Engine::Sequential(engine) => engine.execute_batch(count, f),
            #[cfg(feature = "parallel")]
            Engine::Parallel(engine) => engine.execute_batch(count, f),
        }
    }

    fn strategy(&self) -> ExecutionStrategy {
        match self {
            Engine::Sequential(engine) => engine.strategy(),
            #[cfg(feature = "parallel")]
            Engine::Parallel(engine) => engine.strategy(),
        }
    }

    fn num_threads(&self) -> usize {
        match self {
            Engine::Sequential(engine) => engine.num_threads(),
            #[cfg(feature = "parallel")]
            Engine::Parallel(engine) => engine.num_threads(),
        }
    }
}

impl HierarchicalExecution for Engine {
    type SubordinateEngine = SequentialEngine;

    fn subordinate(&self) -> Self::SubordinateEngine {
        SequentialEngine
    }
}
