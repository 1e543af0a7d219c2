//! # Engine Module
//!
//! Stateful machinery that turns training data into a [`Scorer`](crate::core::scoring::Scorer)
//! and runs scoring at scale.
//!
//! ## Architecture
//!
//! - **Model Builder** ([`builder`]) - Training counts, the live fusion map, and the
//!   frequency, background and likelihood computations
//! - **Background Policies** ([`background`]) - The null distributions a motif is measured against
//! - **Configuration** ([`config`]) - Training and prediction settings, including TOML files
//! - **Worker Pool** (`pool`) - A thread pool scoped to one refinement or scoring call
//! - **Tasks** (`tasks`) - Parallel fusion refinement and chunked batch scoring
//! - **Progress Monitoring** ([`progress`]) - Progress events for the embedding tool
//! - **Error Handling** ([`error`]) - Engine error types

pub mod background;
pub mod builder;
pub mod config;
pub(crate) mod context;
pub mod error;
pub(crate) mod pool;
pub mod progress;
pub(crate) mod tasks;
