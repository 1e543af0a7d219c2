use crate::core::diagnostics::BatchReport;
use crate::core::scoring::{ScoreTable, Scorer};
use crate::engine::error::EngineError;
use crate::engine::pool::WorkerPool;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One peptide to score against alleles that are already known or prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRequest {
    pub peptide: String,
    pub alleles: Vec<String>,
}

type WorkResult = Result<(ScoreTable, BatchReport), EngineError>;

/// Splits `items` into `parts` contiguous chunks whose lengths differ by at most one,
/// longer chunks first. Chunks past the end of a short input are empty.
pub fn split_chunks<T>(items: &[T], parts: usize) -> Vec<&[T]> {
    let parts = parts.max(1);
    let base = items.len() / parts;
    let extra = items.len() % parts;
    let mut chunks = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        chunks.push(&items[start..start + len]);
        start += len;
    }
    chunks
}

/// Scores every request against the read-only `scorer`, one chunk per worker, and merges
/// the per-chunk tables.
#[instrument(skip_all, name = "batch_scoring_task")]
pub fn run(
    scorer: &Scorer,
    requests: &[ScoringRequest],
    pool: &WorkerPool,
    reporter: &ProgressReporter,
) -> Result<(ScoreTable, BatchReport), EngineError> {
    let chunks = split_chunks(requests, pool.workers());
    info!(
        requests = requests.len(),
        chunks = chunks.len(),
        "Starting batch scoring."
    );
    let results: Vec<WorkResult> = reporter.phase("Scoring", || {
        reporter.task(chunks.len(), || {
            pool.install(|| {
                #[cfg(not(feature = "parallel"))]
                let iterator = chunks.iter();

                #[cfg(feature = "parallel")]
                let iterator = chunks.par_iter();

                iterator
                    .map(|chunk| {
                        let result = score_chunk(scorer, chunk);
                        reporter.report(Progress::TaskIncrement);
                        result
                    })
                    .collect()
            })
        })
    });

    let mut table = ScoreTable::new();
    let mut report = BatchReport::new();
    for result in results {
        let (partial, partial_report) = result?;
        for (allele, scores) in partial {
            let merged = table.entry(allele).or_default();
            for (peptide, score) in scores {
                merged.entry(peptide).or_insert(score);
            }
        }
        report.merge(partial_report);
    }
    Ok((table, report))
}

fn score_chunk(scorer: &Scorer, chunk: &[ScoringRequest]) -> WorkResult {
    let mut table = ScoreTable::new();
    let mut report = BatchReport::new();
    for request in chunk {
        for allele in &request.alleles {
            let score = scorer.score(&request.peptide, allele, &mut report)?;
            table
                .entry(allele.clone())
                .or_default()
                .insert(request.peptide.clone(), score);
        }
    }
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::extractor::EnvironmentTable;
    use crate::core::environment::keys::KeyPositions;
    use crate::core::environment::similarity::SimilarityMatrix;
    use crate::core::models::alleles::AlleleIndex;
    use crate::core::models::alphabet::Alphabet;
    use crate::core::models::dataset::TrainingData;
    use crate::core::models::label::BindingLabel;
    use crate::core::models::params::ModelParams;
    use crate::engine::background::BackgroundMode;
    use crate::engine::builder::ModelBuilder;
    use std::sync::Arc;

    fn scorer() -> Scorer {
        let mut envs = EnvironmentTable::new();
        envs.insert("X", vec!["A".to_string(), "A".to_string()]);
        envs.insert("Y", vec!["C".to_string(), "C".to_string()]);
        let params = ModelParams::new(
            Alphabet::new(&['A', 'C']).unwrap(),
            AlleleIndex::new(["X", "Y"]).unwrap(),
            KeyPositions::uniform(vec![vec![0], vec![1]]).unwrap(),
            SimilarityMatrix::identity(&['A', 'C']),
            envs,
        )
        .unwrap();
        let data = TrainingData::new()
            .with(BindingLabel::PositiveHigh, "X", &["AA", "AC"])
            .with(BindingLabel::PositiveHigh, "Y", &["CC"])
            .with(BindingLabel::Negative, "X", &["CC"])
            .with(BindingLabel::Negative, "Y", &["AA"]);
        let mut builder = ModelBuilder::new(Arc::new(params), 1.0, BackgroundMode::Unique);
        builder.initialize(&data, &mut BatchReport::new());
        builder.build()
    }

    fn requests() -> Vec<ScoringRequest> {
        ["AA", "AC", "CA", "CC", "ACA"]
            .iter()
            .map(|p| ScoringRequest {
                peptide: p.to_string(),
                alleles: vec!["X".to_string(), "Y".to_string()],
            })
            .collect()
    }

    #[test]
    fn split_chunks_matches_near_equal_contiguous_partitioning() {
        let items = [1, 2, 3, 4, 5];
        let sizes: Vec<usize> = split_chunks(&items, 3).iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(split_chunks(&items, 3)[1], &[3, 4]);

        let sizes: Vec<usize> = split_chunks(&items[..2], 4).iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![1, 1, 0, 0]);
        assert_eq!(split_chunks(&items, 0).len(), 1);
    }

    #[test]
    fn chunked_scores_match_direct_scoring() {
        let scorer = scorer();
        let requests = requests();
        let pool = WorkerPool::new(3).unwrap();
        let (table, report) = run(&scorer, &requests, &pool, &ProgressReporter::new()).unwrap();
        assert!(report.is_empty());

        let mut direct = BatchReport::new();
        for request in &requests {
            for allele in &request.alleles {
                let expected = scorer.score(&request.peptide, allele, &mut direct).unwrap();
                assert_eq!(table[allele][&request.peptide], expected);
            }
        }
        assert_eq!(table["X"].len(), 5);
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let scorer = scorer();
        let requests = requests();
        let reporter = ProgressReporter::new();
        let one = run(&scorer, &requests, &WorkerPool::new(1).unwrap(), &reporter).unwrap();
        let four = run(&scorer, &requests, &WorkerPool::new(4).unwrap(), &reporter).unwrap();
        assert_eq!(one.0, four.0);
    }

    #[test]
    fn unprepared_alleles_abort_the_batch() {
        let scorer = scorer();
        let requests = vec![ScoringRequest {
            peptide: "AA".to_string(),
            alleles: vec!["W".to_string()],
        }];
        let result = run(
            &scorer,
            &requests,
            &WorkerPool::new(2).unwrap(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Scoring { .. })));
    }
}
