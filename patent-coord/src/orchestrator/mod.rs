//! Coordination internals: fan-out, result collection, dedup and merge.
//!
//! [`execution`] runs one backend per requested database (in parallel or in
//! sequence) and funnels every outcome through the single-consumer
//! [`collector`]. [`merge`] folds completed results into fingerprint-unique
//! records and [`stats`] derives the run's counts.

pub mod collector;
pub mod execution;
pub mod fingerprint;
pub mod merge;
pub mod stats;
