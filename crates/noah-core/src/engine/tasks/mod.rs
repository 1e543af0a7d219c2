//! Parallel phases of training and prediction.
//!
//! Each task runs its work items inside a caller-supplied `WorkerPool`,
//! collects one result per item, and merges the results on the calling thread once every
//! item has finished. Workers only read shared state.

pub mod batch_scoring;
pub mod refinement;
