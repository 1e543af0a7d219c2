use super::builder::ModelBuilder;
use super::config::RefinementConfig;
use super::progress::ProgressReporter;
use crate::core::models::dataset::TestData;

/// Read-only state shared by every refinement worker.
#[derive(Clone, Copy)]
pub struct RefinementContext<'a> {
    pub builder: &'a ModelBuilder,
    pub test_data: &'a TestData,
    pub config: &'a RefinementConfig,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> RefinementContext<'a> {
    pub fn new(
        builder: &'a ModelBuilder,
        test_data: &'a TestData,
        config: &'a RefinementConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            builder,
            test_data,
            config,
            reporter,
        }
    }
}
