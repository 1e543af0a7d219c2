//! # Workflows Module
//!
//! Top-level entry points. Each workflow runs a complete procedure from parsed inputs to
//! results, reporting progress and collecting per-item diagnostics alongside its output.
//!
//! - **Training** ([`train`]) - Environment extraction, counting, optional fusion
//!   refinement and the final model build
//! - **Prediction** ([`predict`]) - Allele resolution, de-novo preparation and parallel
//!   batch scoring
//! - **Evaluation** ([`evaluate`]) - Per-allele and pooled Matthews correlation on
//!   held-out peptides

pub mod evaluate;
pub mod predict;
pub mod train;
