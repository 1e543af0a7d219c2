/// Rounds to 3 decimals, ties to even.
#[inline]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Binary confusion counts at a score threshold (lower scores predict binding).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfusionMatrix {
    pub tp: f64,
    pub fp: f64,
    pub tn: f64,
    pub fn_: f64,
}

impl ConfusionMatrix {
    /// Records one observation: `score <= threshold` predicts a binder.
    pub fn record(&mut self, score: f64, threshold: f64, is_positive: bool) {
        match (score <= threshold, is_positive) {
            (true, true) => self.tp += 1.0,
            (true, false) => self.fp += 1.0,
            (false, true) => self.fn_ += 1.0,
            (false, false) => self.tn += 1.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Matthews correlation coefficient.
    ///
    /// When any margin of the matrix is zero the normalization is undefined and the
    /// unnormalized numerator `TP*TN - FP*FN` is returned instead. That value is not
    /// bounded by [-1, 1].
    pub fn mcc(&self) -> f64 {
        let numerator = self.tp * self.tn - self.fp * self.fn_;
        let denominator =
            (self.tp + self.fp) * (self.tp + self.fn_) * (self.tn + self.fp) * (self.tn + self.fn_);
        if denominator == 0.0 {
            numerator
        } else {
            numerator / denominator.sqrt()
        }
    }
}

impl std::ops::AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, other: Self) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.tn += other.tn;
        self.fn_ += other.fn_;
    }
}
