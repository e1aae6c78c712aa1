//! Core types shared by the robust regression crates
//!
//! This crate provides the pieces every other crate in the workspace leans on:
//!
//! 1. **Errors** - a single [`Error`] enum and [`Result`] alias
//! 2. **Execution Engines** - sequential or Rayon-backed dispatch of
//!    independent resampling tasks
//! 3. **Utilities** - percentiles, ranks, variances and seed derivation
//!
//! # Example
//!
//! ```rust
//! use robust_core::{Engine, ExecutionEngine};
//!
//! let engine = Engine::from_jobs(1).unwrap();
//! let squares = engine.execute_batch(4, |i| i * i);
//! assert_eq!(squares, vec![0, 1, 4, 9]);
//! ```

pub mod error;
pub mod execution;
pub mod utils;

// Re-export core types
pub use error::{Error, Result};

pub use execution::{
    Engine, ExecutionEngine, ExecutionStrategy, HierarchicalExecution, SequentialEngine,
};
#[cfg(feature = "parallel")]
pub use execution::ParallelEngine;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::execution::{
        Engine, ExecutionEngine, ExecutionStrategy, HierarchicalExecution, SequentialEngine,
    };
    pub use crate::Result;
}
