//! # Core Module
//!
//! Fundamental data structures and algorithms for allele/peptide binding models.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Alphabet, allele index, binding labels, datasets and
//!   the dense three-dimensional matrices every model is built from
//! - **Binding Environments** ([`environment`]) - Key alignment columns, extracted
//!   environments, the fusion map and environment similarity
//! - **Scoring** ([`scoring`]) - The immutable trained model, variable-length and de-novo
//!   scoring, and classification metrics
//! - **File I/O** ([`io`]) - Loaders for similarity matrices, key-position tables and
//!   peptide batches
//! - **Diagnostics** ([`diagnostics`]) - Typed per-item warnings collected into batch reports

pub mod diagnostics;
pub mod environment;
pub mod io;
pub mod models;
pub mod scoring;
