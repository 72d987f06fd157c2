//! Output partitioning: critical/deferred and per-route chunks.

pub mod critical;
pub mod routes;
