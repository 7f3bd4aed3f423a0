use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub samples: usize,
    pub mse: f64,
    pub r2: f64,
}

pub fn evaluate(actual: &[f64], predicted: &[f64]) -> RegressionMetrics {
    RegressionMetrics {
        samples: actual.len().min(predicted.len()),
        mse: mean_squared_error(actual, predicted),
        r2: r2_score(actual, predicted),
    }
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n as f64
}

/// Coefficient of determination; 0.0 when the targets have no variance.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual[..n].iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let m = evaluate(&y, &y);
        assert_eq!(m.samples, 4);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn predicting_the_mean_scores_zero() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let p = [2.5; 4];
        assert_eq!(mean_squared_error(&y, &p), 1.25);
        assert!(r2_score(&y, &p).abs() < 1e-12);
    }

    #[test]
    fn constant_targets_and_empty_input() {
        assert_eq!(r2_score(&[5.0, 5.0], &[4.0, 6.0]), 0.0);
        assert_eq!(mean_squared_error(&[], &[]), 0.0);
    }
}
