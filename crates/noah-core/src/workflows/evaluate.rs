use crate::core::diagnostics::{BatchReport, Diagnostic};
use crate::core::models::dataset::TestData;
use crate::core::scoring::Scorer;
use crate::core::scoring::metrics::{ConfusionMatrix, round3};
use std::collections::BTreeMap;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    /// Rounded to 3 decimals.
    pub mcc: f64,
}

impl From<ConfusionMatrix> for Evaluation {
    fn from(confusion: ConfusionMatrix) -> Self {
        Self {
            confusion,
            mcc: round3(confusion.mcc()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub per_allele: BTreeMap<String, Evaluation>,
    /// Counts of every evaluated allele combined.
    pub pooled: Evaluation,
    pub report: BatchReport,
}

/// Classifies the held-out peptides of every allele the scorer can score at `threshold`.
/// Test alleles the scorer cannot score are reported and left out.
#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(scorer: &Scorer, test_data: &TestData, threshold: f64) -> EvaluationResult {
    let mut report = BatchReport::new();
    let mut per_allele = BTreeMap::new();
    let mut pooled = ConfusionMatrix::default();

    for (allele, _) in test_data.iter() {
        if !scorer.is_ready(allele) {
            report.push(Diagnostic::MissingAlleleData {
                allele: allele.to_string(),
            });
            continue;
        }
        let confusion =
            scorer.confusion_matrix(threshold, test_data, Some(&[allele][..]), &mut report);
        pooled += confusion;
        per_allele.insert(allele.to_string(), Evaluation::from(confusion));
    }

    let pooled = Evaluation::from(pooled);
    info!(
        alleles = per_allele.len(),
        mcc = pooled.mcc,
        "Evaluation complete."
    );
    EvaluationResult {
        per_allele,
        pooled,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::keys::KeyPositions;
    use crate::core::environment::similarity::SimilarityMatrix;
    use crate::core::models::alphabet::Alphabet;
    use crate::core::models::dataset::TrainingData;
    use crate::core::models::label::BindingLabel;
    use crate::engine::config::TrainingConfigBuilder;
    use crate::engine::progress::ProgressReporter;
    use crate::workflows::train::{self, TrainingInputs};

    fn trained() -> Scorer {
        let inputs = TrainingInputs {
            alphabet: Alphabet::new(&['A', 'C']).unwrap(),
            alleles: vec!["X".into(), "Y".into()],
            alignment: [("X", "AA"), ("Y", "CC")]
                .iter()
                .map(|(a, s)| (a.to_string(), s.to_string()))
                .collect(),
            key_positions: KeyPositions::uniform(vec![vec![0], vec![1]]).unwrap(),
            similarity: SimilarityMatrix::identity(&['A', 'C']),
            training: TrainingData::new()
                .with(BindingLabel::PositiveHigh, "X", &["AA", "AC"])
                .with(BindingLabel::Negative, "X", &["CC", "CA"])
                .with(BindingLabel::PositiveHigh, "Y", &["AA"])
                .with(BindingLabel::Negative, "Y", &["CC"]),
            test: TestData::new(),
        };
        let config = TrainingConfigBuilder::new()
            .motif_length(2)
            .refinement(None)
            .build()
            .unwrap();
        train::run(&inputs, &config, &ProgressReporter::new())
            .unwrap()
            .scorer
    }

    #[test]
    fn per_allele_and_pooled_mcc() {
        let scorer = trained();
        let test = TestData::new()
            .with("X", BindingLabel::PositiveHigh, &["AA", "AC"])
            .with("X", BindingLabel::Negative, &["CC", "CA"])
            .with("Y", BindingLabel::Negative, &["AA"]);
        let result = run(&scorer, &test, 0.0);

        assert_eq!(result.per_allele["X"].mcc, 1.0);
        // Y: a single false positive, a degenerate matrix.
        assert_eq!(
            result.per_allele["Y"].confusion,
            ConfusionMatrix {
                tp: 0.0,
                fp: 1.0,
                tn: 0.0,
                fn_: 0.0
            }
        );
        assert_eq!(result.per_allele["Y"].mcc, 0.0);
        // TP=2 TN=2 FP=1 FN=0 -> 4 / sqrt(3 * 2 * 3 * 2)
        assert_eq!(result.pooled.mcc, round3(4.0 / 6.0));

        let mut report = BatchReport::new();
        assert_eq!(result.pooled.mcc, scorer.score_mcc(0.0, &test, None, &mut report));
    }

    #[test]
    fn unknown_test_alleles_are_reported() {
        let scorer = trained();
        let test = TestData::new().with("Q", BindingLabel::PositiveHigh, &["AA"]);
        let result = run(&scorer, &test, 0.0);
        assert!(result.per_allele.is_empty());
        assert!(result.report.contains(&Diagnostic::MissingAlleleData {
            allele: "Q".to_string()
        }));
        assert_eq!(result.pooled.confusion.total(), 0.0);
    }
}
