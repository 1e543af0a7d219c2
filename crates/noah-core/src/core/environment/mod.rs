pub mod extractor;
pub mod fusion;
pub mod keys;
pub mod similarity;
