use std::cmp::Ordering;

use crate::forest::RandomForest;
use crate::model::FittedTarget;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceBar {
    pub feature: String,
    pub importance: f64,
}

/// Feature importances sorted ascending, so the most important bar ends up last.
pub fn importance_bars(model: &RandomForest) -> Vec<ImportanceBar> {
    let mut bars: Vec<ImportanceBar> = model
        .feature_names()
        .iter()
        .zip(model.feature_importances())
        .map(|(feature, &importance)| ImportanceBar {
            feature: feature.clone(),
            importance,
        })
        .collect();
    bars.sort_by(|a, b| {
        a.importance
            .partial_cmp(&b.importance)
            .unwrap_or(Ordering::Equal)
    });
    bars
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlot {
    /// `(actual, predicted)` for every held-out row.
    pub points: Vec<(f64, f64)>,
    /// Endpoints of the `y = x` reference line across the actual range.
    pub identity: [(f64, f64); 2],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

pub fn predicted_vs_actual(target: &FittedTarget) -> ScatterPlot {
    let points: Vec<(f64, f64)> = target
        .test_actual
        .iter()
        .copied()
        .zip(target.test_predicted.iter().copied())
        .collect();

    let (lo, hi) = min_max(points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (p_lo, p_hi) = min_max(points.iter().map(|p| p.1)).unwrap_or((lo, hi));

    let x_bounds = padded(lo, hi);
    let y_bounds = padded(lo.min(p_lo), hi.max(p_hi));
    ScatterPlot {
        points,
        identity: [(lo, lo), (hi, hi)],
        x_bounds,
        y_bounds,
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn padded(lo: f64, hi: f64) -> [f64; 2] {
    let span = (hi - lo).abs();
    let pad = if span > 0.0 { span * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    [lo - pad, hi + pad]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestConfig;
    use crate::metrics::evaluate;

    #[test]
    fn bars_are_sorted_ascending() {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![i as f64, (i % 2) as f64, ((i * 5) % 7) as f64])
            .collect();
        let labels: Vec<f64> = (0..60).map(|i| 2.0 * i as f64 + (i % 2) as f64).collect();
        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 5,
            ..ForestConfig::default()
        });
        forest.fit(&["a", "b", "c"], &features, &labels).unwrap();

        let bars = importance_bars(&forest);
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].importance <= w[1].importance));
        assert_eq!(bars.last().map(|b| b.feature.as_str()), Some("a"));
    }

    #[test]
    fn identity_line_spans_actual_range() {
        let target = FittedTarget {
            model: RandomForest::new(ForestConfig::default()),
            metrics: evaluate(&[3.0, 9.0, 5.0], &[4.0, 8.0, 5.5]),
            test_actual: vec![3.0, 9.0, 5.0],
            test_predicted: vec![4.0, 8.0, 5.5],
        };
        let plot = predicted_vs_actual(&target);
        assert_eq!(plot.points.len(), 3);
        assert_eq!(plot.identity, [(3.0, 3.0), (9.0, 9.0)]);
        assert!(plot.x_bounds[0] < 3.0 && plot.x_bounds[1] > 9.0);
    }
}
