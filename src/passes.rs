//! AST-rewriting passes.
//!
//! Each pass consumes a node list and returns a new one. The orchestrator
//! runs them in a fixed order: purge → dedupe → atomic.

pub mod atomic;
pub mod dedupe;
pub mod purge;
