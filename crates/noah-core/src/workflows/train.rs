use crate::core::diagnostics::{BatchReport, Diagnostic};
use crate::core::environment::extractor::{EnvironmentTable, extract_allele};
use crate::core::environment::keys::KeyPositions;
use crate::core::environment::similarity::SimilarityMatrix;
use crate::core::models::alleles::AlleleIndex;
use crate::core::models::alphabet::Alphabet;
use crate::core::models::dataset::{CuratedDataset, TestData, TrainingData};
use crate::core::models::params::ModelParams;
use crate::core::scoring::Scorer;
use crate::engine::builder::ModelBuilder;
use crate::engine::config::{ConfigError, TrainingConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything a model is trained from, already parsed.
#[derive(Debug, Clone)]
pub struct TrainingInputs {
    pub alphabet: Alphabet,
    /// Alleles to model. Alleles without a usable aligned sequence are left out.
    pub alleles: Vec<String>,
    /// Allele -> aligned sequence.
    pub alignment: HashMap<String, String>,
    pub key_positions: KeyPositions,
    pub similarity: SimilarityMatrix,
    pub training: TrainingData,
    /// Held-out peptides refinement is judged on.
    pub test: TestData,
}

impl TrainingInputs {
    /// Inputs for the alleles and data views selected by dataset curation.
    pub fn from_curated(
        dataset: CuratedDataset,
        alphabet: Alphabet,
        alignment: HashMap<String, String>,
        key_positions: KeyPositions,
        similarity: SimilarityMatrix,
    ) -> Self {
        Self {
            alphabet,
            alleles: dataset.alleles,
            alignment,
            key_positions,
            similarity,
            training: dataset.training,
            test: dataset.test,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingResult {
    pub scorer: Scorer,
    pub report: BatchReport,
}

#[instrument(skip_all, name = "training_workflow")]
pub fn run(
    inputs: &TrainingInputs,
    config: &TrainingConfig,
    reporter: &ProgressReporter,
) -> Result<TrainingResult, EngineError> {
    // === Phase 0: Preparation ===
    let mut report = BatchReport::new();
    let mut builder = reporter.phase("Preparation", || -> Result<_, EngineError> {
        if config.motif_length != inputs.key_positions.motif_length() {
            return Err(ConfigError::InvalidParameter {
                name: "motif_length",
                reason: format!(
                    "configured as {} but the key-position table covers {} positions",
                    config.motif_length,
                    inputs.key_positions.motif_length()
                ),
            }
            .into());
        }

        let environments = extract_environments(inputs, &mut report);
        let modeled: Vec<&str> = inputs
            .alleles
            .iter()
            .map(String::as_str)
            .filter(|allele| environments.contains(allele))
            .collect();
        info!(
            requested = inputs.alleles.len(),
            modeled = modeled.len(),
            "Extracted binding environments."
        );

        let alleles =
            AlleleIndex::new(modeled).map_err(|e| EngineError::Initialization(e.to_string()))?;
        let params = ModelParams::new(
            inputs.alphabet.clone(),
            alleles,
            inputs.key_positions.clone(),
            inputs.similarity.clone(),
            environments,
        )?;

        let mut builder = ModelBuilder::from_config(Arc::new(params), config);
        builder.initialize(&inputs.training, &mut report);
        Ok(builder)
    })?;

    // === Phase 1: Refinement (optional) and final build ===
    let scorer = match &config.refinement {
        Some(refinement) => builder.refine(
            &inputs.test,
            refinement,
            config.workers,
            reporter,
            &mut report,
        )?,
        None => builder.build(),
    };

    info!(
        fused = scorer.fusion().fused_count(),
        diagnostics = report.len(),
        "Training complete."
    );
    Ok(TrainingResult { scorer, report })
}

fn extract_environments(inputs: &TrainingInputs, report: &mut BatchReport) -> EnvironmentTable {
    let mut table = EnvironmentTable::new();
    for allele in &inputs.alleles {
        let Some(sequence) = inputs.alignment.get(allele) else {
            report.push(Diagnostic::MissingAlleleData {
                allele: allele.clone(),
            });
            continue;
        };
        if let Some(envs) = extract_allele(&inputs.key_positions, allele, sequence, report) {
            table.insert(allele, envs);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::label::BindingLabel;
    use crate::core::models::params::ModelParamsError;
    use crate::engine::config::TrainingConfigBuilder;

    fn inputs() -> TrainingInputs {
        let alignment = [("X", "AA"), ("Y", "AA"), ("Z", "CC"), ("V", "A")]
            .iter()
            .map(|(a, s)| (a.to_string(), s.to_string()))
            .collect();
        TrainingInputs {
            alphabet: Alphabet::new(&['A', 'C']).unwrap(),
            alleles: ["X", "Y", "Z", "W", "V"].iter().map(|a| a.to_string()).collect(),
            alignment,
            key_positions: KeyPositions::uniform(vec![vec![0], vec![1]]).unwrap(),
            similarity: SimilarityMatrix::identity(&['A', 'C']),
            training: TrainingData::new()
                .with(BindingLabel::PositiveHigh, "X", &["AA", "AC"])
                .with(BindingLabel::Negative, "X", &["CC", "CA"])
                .with(BindingLabel::PositiveHigh, "Y", &["AA"])
                .with(BindingLabel::Negative, "Y", &["CC"])
                .with(BindingLabel::PositiveHigh, "Z", &["CC"])
                .with(BindingLabel::Negative, "Z", &["AA"]),
            test: TestData::new(),
        }
    }

    #[test]
    fn alleles_without_usable_sequences_are_excluded_and_reported() {
        let config = TrainingConfigBuilder::new()
            .motif_length(2)
            .refinement(None)
            .build()
            .unwrap();
        let result = run(&inputs(), &config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.scorer.params().alleles.names(), &["X", "Y", "Z"]);
        assert!(result.report.contains(&Diagnostic::MissingAlleleData {
            allele: "W".to_string()
        }));
        assert!(result.report.contains(&Diagnostic::ColumnOutOfRange {
            allele: "V".to_string(),
            column: 1,
            sequence_length: 1,
        }));
        assert_eq!(result.scorer.fusion().fused_count(), 0);
    }

    #[test]
    fn trained_models_score_binders_below_non_binders() {
        let config = TrainingConfigBuilder::new()
            .motif_length(2)
            .workers(2)
            .build()
            .unwrap();
        let result = run(&inputs(), &config, &ProgressReporter::new()).unwrap();
        let scorer = &result.scorer;

        // X and Y share every environment and are fused; Z is not.
        assert_eq!(scorer.fusion().group(0, 0), &[0, 1]);
        assert_eq!(scorer.fusion().group(1, 1), &[1, 0]);
        assert_eq!(scorer.fusion().group(0, 2), &[2]);

        let mut report = BatchReport::new();
        let binder = scorer.score("AA", "X", &mut report).unwrap();
        let non_binder = scorer.score("CC", "X", &mut report).unwrap();
        assert!(binder < non_binder);
        let z_binder = scorer.score("CC", "Z", &mut report).unwrap();
        let z_non_binder = scorer.score("AA", "Z", &mut report).unwrap();
        assert!(z_binder < z_non_binder);
    }

    #[test]
    fn motif_length_must_match_the_key_positions() {
        let config = TrainingConfigBuilder::new().motif_length(3).build().unwrap();
        let result = run(&inputs(), &config, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Config { .. })));
    }

    #[test]
    fn training_without_any_usable_allele_fails() {
        let mut inputs = inputs();
        inputs.alleles = vec!["W".to_string()];
        let config = TrainingConfigBuilder::new().motif_length(2).build().unwrap();
        let result = run(&inputs, &config, &ProgressReporter::new());
        assert!(matches!(
            result,
            Err(EngineError::Params {
                source: ModelParamsError::NoAlleles
            })
        ));
    }

    #[test]
    fn duplicate_alleles_fail_initialization() {
        let mut inputs = inputs();
        inputs.alleles = vec!["X".to_string(), "X".to_string()];
        let config = TrainingConfigBuilder::new().motif_length(2).build().unwrap();
        let result = run(&inputs, &config, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Initialization(_))));
    }
}
