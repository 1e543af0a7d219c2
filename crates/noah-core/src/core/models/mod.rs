pub mod alleles;
pub mod alphabet;
pub mod dataset;
pub mod label;
pub mod matrix;
pub mod params;
