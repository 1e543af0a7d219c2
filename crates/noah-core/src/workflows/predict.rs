use crate::core::diagnostics::BatchReport;
use crate::core::models::dataset::PeptideRecord;
use crate::core::scoring::{ScoreTable, Scorer};
use crate::engine::config::PredictionConfig;
use crate::engine::error::EngineError;
use crate::engine::pool::WorkerPool;
use crate::engine::progress::ProgressReporter;
use crate::engine::tasks::batch_scoring::{self, ScoringRequest};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub scores: ScoreTable,
    /// Items scored with skipped residues or interpolated profiles.
    pub report: BatchReport,
}

/// Scores every `(peptide, allele)` record.
///
/// Allele names are resolved once each, exactly as [`Scorer::score_peptide`] does, and
/// de-novo profiles are built before scoring starts. Unknown alleles need their aligned
/// sequence loaded with [`Scorer::load_sequences`] beforehand; a missing sequence aborts
/// the whole prediction.
#[instrument(skip_all, name = "prediction_workflow")]
pub fn run(
    scorer: &mut Scorer,
    records: &[PeptideRecord],
    config: &PredictionConfig,
    reporter: &ProgressReporter,
) -> Result<PredictionResult, EngineError> {
    // === Phase 0: Allele resolution ===
    let mut report = BatchReport::new();
    let requests = reporter.phase("Allele Resolution", || -> Result<_, EngineError> {
        let mut resolved: HashMap<&str, Vec<String>> = HashMap::new();
        let mut by_peptide: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for record in records {
            if !resolved.contains_key(record.allele.as_str()) {
                let alleles = scorer.resolve_alleles(&[record.allele.as_str()], &mut report)?;
                resolved.insert(record.allele.as_str(), alleles);
            }
            let targets = by_peptide.entry(record.peptide.as_str()).or_default();
            for allele in &resolved[record.allele.as_str()] {
                if !targets.contains(allele) {
                    targets.push(allele.clone());
                }
            }
        }
        let requests: Vec<ScoringRequest> = by_peptide
            .into_iter()
            .map(|(peptide, alleles)| ScoringRequest {
                peptide: peptide.to_string(),
                alleles,
            })
            .collect();
        info!(
            records = records.len(),
            peptides = requests.len(),
            alleles = resolved.len(),
            "Resolved prediction requests."
        );
        Ok(requests)
    })?;

    // === Phase 1: Parallel scoring ===
    let pool = WorkerPool::new(config.workers)?;
    let (scores, scoring_report) = batch_scoring::run(scorer, &requests, &pool, reporter)?;
    report.merge(scoring_report);

    Ok(PredictionResult { scores, report })
}
