use crate::core::diagnostics::BatchReport;
use crate::core::environment::similarity::{Candidate, Ranking};
use crate::engine::config::RefinementConfig;
use crate::engine::context::RefinementContext;
use crate::engine::error::EngineError;
use crate::engine::pool::WorkerPool;
use crate::engine::progress::Progress;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fusions accepted for one allele, one member list per motif position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedFusions {
    pub allele: usize,
    pub positions: Vec<Vec<usize>>,
}

#[derive(Debug, Default)]
pub struct RefinementOutcome {
    pub accepted: Vec<AcceptedFusions>,
    pub report: BatchReport,
}

type WorkResult = Result<(AcceptedFusions, BatchReport), EngineError>;

/// Every allele's known neighbors ranked per position against the live fusion map.
pub fn rank_candidates(context: &RefinementContext, report: &mut BatchReport) -> Vec<Ranking> {
    let params = context.builder.params();
    let comparer = params.comparer();
    let ranking_context = params.ranking_context(context.builder.fusion());
    (0..params.alleles.len())
        .map(|allele| comparer.rank_known(allele, ranking_context, report))
        .collect()
}

/// Evaluates every allele's ranked candidates independently and returns the accepted
/// fusions. Nothing is applied to the builder; a failed allele fails the whole phase.
///
/// `rankings[a]` lists the candidates of allele `a`. Missing entries mean no candidates.
#[instrument(skip_all, name = "refinement_task")]
pub fn run(
    context: &RefinementContext,
    rankings: &[Ranking],
    pool: &WorkerPool,
) -> Result<RefinementOutcome, EngineError> {
    let alleles = context.builder.params().alleles.len();
    info!(alleles, workers = pool.workers(), "Starting fusion refinement.");
    let reporter = context.reporter;

    let work_list: Vec<usize> = (0..alleles).collect();
    let results: Vec<WorkResult> = reporter.phase("Refinement", || {
        reporter.task(alleles, || {
            pool.install(|| {
                #[cfg(not(feature = "parallel"))]
                let iterator = work_list.iter();

                #[cfg(feature = "parallel")]
                let iterator = work_list.par_iter();

                iterator
                    .map(|&allele| {
                        let ranking = rankings.get(allele).map_or(&[][..], Vec::as_slice);
                        let result =
                            guarded(context, allele, || refine_allele(context, allele, ranking));
                        reporter.report(Progress::TaskIncrement);
                        result
                    })
                    .collect()
            })
        })
    });

    let mut outcome = RefinementOutcome::default();
    for result in results {
        let (accepted, report) = result?;
        outcome.report.merge(report);
        outcome.accepted.push(accepted);
    }

    let total: usize = outcome
        .accepted
        .iter()
        .flat_map(|a| a.positions.iter())
        .map(Vec::len)
        .sum();
    info!(accepted = total, "Fusion refinement finished.");
    reporter.message(format!("{} fusions accepted across {} alleles", total, alleles));
    Ok(outcome)
}

/// Runs one allele's work, turning a panic into `RefinementFailed` for that allele.
fn guarded(
    context: &RefinementContext,
    allele: usize,
    work: impl FnOnce() -> WorkResult,
) -> WorkResult {
    catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        Err(EngineError::RefinementFailed {
            allele: context.builder.params().alleles.name(allele).to_string(),
            reason: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[instrument(skip_all, fields(allele = %context.builder.params().alleles.name(allele)))]
fn refine_allele(
    context: &RefinementContext,
    allele: usize,
    ranking: &[Vec<Candidate>],
) -> WorkResult {
    let builder = context.builder;
    let params = builder.params();
    let name = params.alleles.name(allele);
    let selected = [name];
    let threshold = context.config.mcc_threshold;
    let comparer = params.comparer();
    let mut report = BatchReport::new();

    let base = builder
        .build()
        .score_mcc(threshold, context.test_data, Some(&selected[..]), &mut report);
    debug!(mcc = base, "Baseline MCC.");

    let motif_length = params.motif_length();
    let mut positions = vec![Vec::new(); motif_length];
    for (position, accepted) in positions.iter_mut().enumerate() {
        let self_similarity =
            comparer.compare(&params.environments, name, name, position, &mut report);
        let candidates = ranking.get(position).map_or(&[][..], Vec::as_slice);
        for candidate in candidates {
            if candidate.allele >= params.alleles.len() {
                return Err(EngineError::RefinementFailed {
                    allele: name.to_string(),
                    reason: format!(
                        "candidate index {} at position {} is not a known allele",
                        candidate.allele, position
                    ),
                });
            }
            if builder.fusion().contains(position, allele, candidate.allele) {
                continue;
            }
            let mut trial = builder.fusion().clone();
            trial.append(position, allele, candidate.allele);
            let mcc = builder.build_with(&trial).score_mcc(
                threshold,
                context.test_data,
                Some(&selected[..]),
                &mut report,
            );
            let verdict =
                accepts(context.config, candidate.similarity, self_similarity, base, mcc);
            trace!(
                position,
                candidate = params.alleles.name(candidate.allele),
                mcc,
                verdict,
                "Evaluated fusion candidate."
            );
            if verdict {
                accepted.push(candidate.allele);
            }
        }
    }

    Ok((
        AcceptedFusions {
            allele,
            positions,
        },
        report,
    ))
}

/// A candidate is accepted when it is as similar as the allele itself and costs less
/// than the margin in MCC, or when it improves MCC by more than the margin.
fn accepts(
    config: &RefinementConfig,
    similarity: f64,
    self_similarity: f64,
    base_mcc: f64,
    candidate_mcc: f64,
) -> bool {
    let drop = base_mcc - candidate_mcc;
    let tied = (similarity - self_similarity).abs() <= config.tie_epsilon;
    (tied && drop < config.acceptance_margin) || drop < -config.acceptance_margin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::extractor::EnvironmentTable;
    use crate::core::environment::keys::KeyPositions;
    use crate::core::environment::similarity::SimilarityMatrix;
    use crate::core::models::alleles::AlleleIndex;
    use crate::core::models::alphabet::Alphabet;
    use crate::core::models::dataset::{TestData, TrainingData};
    use crate::core::models::label::BindingLabel;
    use crate::core::models::params::ModelParams;
    use crate::engine::background::BackgroundMode;
    use crate::engine::builder::ModelBuilder;
    use crate::engine::progress::ProgressReporter;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn builder(envs: &[(&str, &str)], motif_length: usize, data: &TrainingData) -> ModelBuilder {
        let mut table = EnvironmentTable::new();
        for (allele, env) in envs {
            table.insert(allele, vec![env.to_string(); motif_length]);
        }
        let columns = (0..motif_length).map(|p| vec![p]).collect();
        let params = ModelParams::new(
            Alphabet::new(&['A', 'C']).unwrap(),
            AlleleIndex::new(envs.iter().map(|(a, _)| *a)).unwrap(),
            KeyPositions::uniform(columns).unwrap(),
            SimilarityMatrix::identity(&['A', 'C']),
            table,
        )
        .unwrap();
        let mut builder = ModelBuilder::new(Arc::new(params), 1.0, BackgroundMode::Unique);
        builder.initialize(data, &mut BatchReport::new());
        builder
    }

    fn refine(
        builder: &ModelBuilder,
        test: &TestData,
        config: &RefinementConfig,
        workers: usize,
    ) -> RefinementOutcome {
        let reporter = ProgressReporter::new();
        let context = RefinementContext::new(builder, test, config, &reporter);
        let rankings = rank_candidates(&context, &mut BatchReport::new());
        let pool = WorkerPool::new(workers).unwrap();
        run(&context, &rankings, &pool).unwrap()
    }

    #[test]
    fn acceptance_rule_follows_ties_and_margins() {
        let config = RefinementConfig::default();
        // tied, small drop
        assert!(accepts(&config, 1.0, 1.0, 0.5, 0.45));
        // tied, drop too large
        assert!(!accepts(&config, 1.0, 1.0, 0.5, 0.3));
        // not tied, no improvement
        assert!(!accepts(&config, 0.9, 1.0, 0.5, 0.55));
        // not tied, clear improvement
        assert!(accepts(&config, 0.9, 1.0, 0.5, 0.65));

        let loose = RefinementConfig {
            tie_epsilon: 0.2,
            ..config
        };
        assert!(accepts(&loose, 0.9, 1.0, 0.5, 0.45));
    }

    #[test]
    fn tied_neighbors_are_fused_and_dissimilar_ones_rejected() {
        let data = TrainingData::new()
            .with(BindingLabel::PositiveHigh, "X", &["AA"])
            .with(BindingLabel::PositiveHigh, "Y", &["AC"])
            .with(BindingLabel::PositiveHigh, "Z", &["CC"]);
        let builder = builder(&[("X", "A"), ("Y", "A"), ("Z", "C")], 2, &data);
        let outcome = refine(&builder, &TestData::new(), &RefinementConfig::default(), 1);

        let by_allele: Vec<&Vec<Vec<usize>>> =
            outcome.accepted.iter().map(|a| &a.positions).collect();
        assert_eq!(by_allele[0], &vec![vec![1], vec![1]]);
        assert_eq!(by_allele[1], &vec![vec![0], vec![0]]);
        assert_eq!(by_allele[2], &vec![Vec::<usize>::new(), Vec::new()]);
    }

    #[test]
    fn a_clear_mcc_improvement_overrides_dissimilarity() {
        // X alone scores A as a non-binder and C as a binder, the opposite of its test
        // labels. Pooling Z's counts flattens X's motif and removes the false positive.
        let data = TrainingData::new()
            .with(BindingLabel::PositiveHigh, "X", &["C"])
            .with(BindingLabel::Negative, "X", &["A"])
            .with(BindingLabel::PositiveHigh, "Z", &["A"]);
        let test = TestData::new()
            .with("X", BindingLabel::PositiveHigh, &["A"])
            .with("X", BindingLabel::Negative, &["C"]);
        let builder = builder(&[("X", "A"), ("Z", "C")], 1, &data);

        let config = RefinementConfig {
            mcc_threshold: -0.8,
            ..RefinementConfig::default()
        };
        let mut report = BatchReport::new();
        let base = builder.build().score_mcc(-0.8, &test, Some(&["X"][..]), &mut report);
        assert_eq!(base, -1.0);

        let outcome = refine(&builder, &test, &config, 2);
        assert_eq!(outcome.accepted[0].positions, vec![vec![1]]);
        assert_eq!(outcome.accepted[1].positions, vec![Vec::<usize>::new()]);
    }

    #[test]
    fn refining_with_empty_rankings_changes_nothing() {
        let data = TrainingData::new().with(BindingLabel::PositiveHigh, "X", &["AA"]);
        let mut builder = builder(&[("X", "A"), ("Y", "A")], 2, &data);
        builder.extend_fusion(0, 0, &[1]);
        let before = builder.fusion().clone();

        let config = RefinementConfig::default();
        let reporter = ProgressReporter::new();
        let test = TestData::new();
        let context = RefinementContext::new(&builder, &test, &config, &reporter);
        let pool = WorkerPool::new(2).unwrap();
        let outcome = run(&context, &[], &pool).unwrap();

        for fusions in &outcome.accepted {
            for (position, members) in fusions.positions.iter().enumerate() {
                builder.extend_fusion(position, fusions.allele, members);
            }
        }
        assert_eq!(builder.fusion(), &before);
    }

    #[test]
    fn existing_members_are_never_removed() {
        let data = TrainingData::new()
            .with(BindingLabel::PositiveHigh, "X", &["AA"])
            .with(BindingLabel::PositiveHigh, "Z", &["CC"]);
        let mut builder = builder(&[("X", "A"), ("Y", "A"), ("Z", "C")], 2, &data);
        builder.extend_fusion(1, 0, &[2]);

        let test = TestData::new();
        let scorer = builder
            .refine(
                &test,
                &RefinementConfig::default(),
                2,
                &ProgressReporter::new(),
                &mut BatchReport::new(),
            )
            .unwrap();
        assert_eq!(scorer.fusion().group(0, 0), &[0, 1]);
        assert_eq!(scorer.fusion().group(1, 0), &[0, 2, 1]);
    }

    #[test]
    fn results_do_not_depend_on_worker_count() {
        let data = TrainingData::new()
            .with(BindingLabel::PositiveHigh, "X", &["AA", "AC"])
            .with(BindingLabel::PositiveHigh, "Y", &["CA"])
            .with(BindingLabel::Negative, "Y", &["CC"]);
        let test = TestData::new()
            .with("X", BindingLabel::PositiveHigh, &["AA"])
            .with("Y", BindingLabel::Negative, &["AC"]);
        let builder = builder(&[("X", "A"), ("Y", "A"), ("Z", "C")], 2, &data);
        let config = RefinementConfig::default();
        let sequential = refine(&builder, &test, &config, 1);
        let parallel = refine(&builder, &test, &config, 3);
        assert_eq!(sequential.accepted, parallel.accepted);
    }

    #[test]
    fn malformed_rankings_fail_the_phase() {
        let data = TrainingData::new().with(BindingLabel::PositiveHigh, "X", &["A"]);
        let builder = builder(&[("X", "A")], 1, &data);
        let config = RefinementConfig::default();
        let reporter = ProgressReporter::new();
        let test = TestData::new();
        let context = RefinementContext::new(&builder, &test, &config, &reporter);
        let rankings = vec![vec![vec![Candidate {
            allele: 7,
            similarity: 1.0,
        }]]];
        let result = run(&context, &rankings, &WorkerPool::new(1).unwrap());
        assert!(matches!(
            result,
            Err(EngineError::RefinementFailed { ref allele, .. }) if allele == "X"
        ));
    }

    #[test]
    fn panicking_workers_fail_their_allele() {
        let data = TrainingData::new().with(BindingLabel::PositiveHigh, "X", &["AA"]);
        let builder = builder(&[("X", "A"), ("Y", "A")], 2, &data);
        let config = RefinementConfig::default();
        let reporter = ProgressReporter::new();
        let test = TestData::new();
        let context = RefinementContext::new(&builder, &test, &config, &reporter);

        let result = guarded(&context, 1, || panic!("ranking exhausted"));
        assert!(matches!(
            result,
            Err(EngineError::RefinementFailed { ref allele, ref reason })
                if allele == "Y" && reason == "ranking exhausted"
        ));

        let position = 3;
        let result = guarded(&context, 0, || panic!("no row at position {}", position));
        assert!(matches!(
            result,
            Err(EngineError::RefinementFailed { ref reason, .. })
                if reason == "no row at position 3"
        ));

        assert!(guarded(&context, 0, || refine_allele(&context, 0, &[])).is_ok());
    }

    #[test]
    fn progress_counts_one_increment_per_allele() {
        let data = TrainingData::new().with(BindingLabel::PositiveHigh, "X", &["AA"]);
        let builder = builder(&[("X", "A"), ("Y", "A"), ("Z", "C")], 2, &data);
        let increments = AtomicUsize::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if matches!(event, Progress::TaskIncrement) {
                increments.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let config = RefinementConfig::default();
        let test = TestData::new();
        let context = RefinementContext::new(&builder, &test, &config, &reporter);
        run(&context, &[], &WorkerPool::new(2).unwrap()).unwrap();
        assert_eq!(increments.load(Ordering::SeqCst), 3);
    }
}
