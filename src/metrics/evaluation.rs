use std::fmt;

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f32]) -> usize {
    let mut max_val = f32::NEG_INFINITY;
    let mut max_idx = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > max_val {
            max_val = v;
            max_idx = i;
        }
    }
    max_idx
}

/// Accuracy over a labelled batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// `correct / total`, or 0.0 for an empty batch.
    pub accuracy: f32,
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    pub fn new(correct: usize, total: usize) -> Self {
        let accuracy = if total == 0 { 0.0 } else { correct as f32 / total as f32 };
        Evaluation { accuracy, correct, total }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "accuracy {:.2}% ({}/{})", self.accuracy * 100.0, self.correct, self.total)
    }
}

/// Agreement between the tiled integer path and the float reference path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub compared: usize,
    pub prediction_matches: usize,
    /// Largest absolute logit difference seen.
    pub max_abs_diff: f32,
}

impl Verification {
    pub fn all_match(&self) -> bool {
        self.prediction_matches == self.compared
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} predictions match, max logit difference {:.6}",
            self.prediction_matches, self.compared, self.max_abs_diff
        )
    }
}
