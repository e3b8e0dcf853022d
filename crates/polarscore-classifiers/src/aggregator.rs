//! Projection of class probabilities onto a score weight vector

use polarscore_core::{ClassProbabilities, Error, Result, ScoreWeights};

/// Inner product of probabilities and weights, accumulated in `f64`
///
/// A zero weight makes its class irrelevant whatever its confidence.
/// Mismatched lengths mean the model and the configured weights disagree
/// about the number of classes.
pub fn aggregate(probs: &ClassProbabilities, weights: &ScoreWeights) -> Result<f64> {
    if probs.len() != weights.len() {
        return Err(Error::model_format(format!(
            "{} class probabilities cannot be projected onto {} weights",
            probs.len(),
            weights.len()
        )));
    }

    Ok(probs
        .as_slice()
        .iter()
        .zip(weights.as_slice())
        .map(|(&p, &w)| f64::from(p) * w)
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    fn probs(values: &[f32]) -> ClassProbabilities {
        ClassProbabilities::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_polarity_all_confident_cancels() {
        let score = aggregate(&probs(&[1.0, 1.0, 1.0]), &ScoreWeights::polarity()).unwrap();
        assert!(score.abs() < EPS);
    }

    #[test]
    fn test_polarity_positive() {
        let score = aggregate(&probs(&[0.0, 1.0, 1.0]), &ScoreWeights::polarity()).unwrap();
        assert!((score - 1.0).abs() < EPS);
    }

    #[test]
    fn test_polarity_negative() {
        let score = aggregate(&probs(&[1.0, 0.0, 0.0]), &ScoreWeights::polarity()).unwrap();
        assert!((score + 1.0).abs() < EPS);
    }

    #[test]
    fn test_neutral_class_ignored() {
        let low = aggregate(&probs(&[0.2, 0.0, 0.7]), &ScoreWeights::polarity()).unwrap();
        let high = aggregate(&probs(&[0.2, 1.0, 0.7]), &ScoreWeights::polarity()).unwrap();
        assert!((low - high).abs() < EPS);
        assert!((low - 0.5).abs() < EPS);
    }

    #[test]
    fn test_length_mismatch_is_format_error() {
        let err = aggregate(&probs(&[0.5, 0.5]), &ScoreWeights::polarity()).unwrap_err();
        assert!(matches!(err, Error::ModelFormat(_)));
    }

    fn probs_and_weights() -> impl Strategy<Value = (Vec<f32>, Vec<f32>, Vec<f64>)> {
        (1usize..8).prop_flat_map(|n| {
            (
                prop::collection::vec(0.0f32..=1.0, n),
                prop::collection::vec(0.0f32..=1.0, n),
                prop::collection::vec(-10.0f64..10.0, n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_matches_inner_product((p, _, w) in probs_and_weights()) {
            let expected: f64 = p.iter().zip(&w).map(|(&p, &w)| f64::from(p) * w).sum();
            let weights = ScoreWeights::new(w).unwrap();
            let score = aggregate(&probs(&p), &weights).unwrap();
            prop_assert!((score - expected).abs() < EPS);
        }

        #[test]
        fn prop_linear_in_probabilities(
            (p1, p2, w) in probs_and_weights(),
            a in 0.0f32..=1.0,
        ) {
            // Convex combination keeps every entry inside [0, 1]
            let b = 1.0 - a;
            let mixed: Vec<f32> = p1
                .iter()
                .zip(&p2)
                .map(|(&x, &y)| (a * x + b * y).clamp(0.0, 1.0))
                .collect();
            let weights = ScoreWeights::new(w).unwrap();

            let lhs = aggregate(&probs(&mixed), &weights).unwrap();
            let rhs = f64::from(a) * aggregate(&probs(&p1), &weights).unwrap()
                + f64::from(b) * aggregate(&probs(&p2), &weights).unwrap();
            // f32 mixing error scaled by the largest weights
            prop_assert!((lhs - rhs).abs() < 1e-4);
        }
    }
}
