//! # NOAH Core Library
//!
//! A library for building and applying position-specific allele/peptide binding models,
//! based on the NOAH method: per-position log-likelihood matrices whose statistics are
//! pooled across alleles that share a similar structural binding environment.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (alphabet, allele index, datasets,
//!   three-dimensional matrices), binding environments and the fusion map, the environment
//!   similarity engine, loaders, and the immutable trained [`core::scoring::Scorer`].
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. It holds the `ModelBuilder` that turns
//!   counts into likelihood matrices under a chosen background policy, the configuration and
//!   error types, and the parallel tasks (fusion refinement and batch scoring) that run inside
//!   a scoped worker pool.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (training, prediction,
//!   evaluation) that tie `engine` and `core` together behind a single entry point each.

pub mod core;
pub mod engine;
pub mod workflows;
