use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::config::{AppConfig, TrainConfig};
use crate::dataset::{self, PlayerTable};
use crate::features::{MARKET_FEATURES, MARKET_TARGET, OVERALL_FEATURES, OVERALL_TARGET};
use crate::forest::RandomForest;
use crate::metrics::{self, RegressionMetrics};
use crate::split::{select, train_test_split};

#[derive(Debug, Clone)]
pub struct FittedTarget {
    pub model: RandomForest,
    pub metrics: RegressionMetrics,
    pub test_actual: Vec<f64>,
    pub test_predicted: Vec<f64>,
}

/// Both models and their hold-out scores. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub overall: FittedTarget,
    pub market: FittedTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub overall: RegressionMetrics,
    pub market: RegressionMetrics,
    pub market_importances: Vec<(String, f64)>,
}

impl TrainedModels {
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            overall: self.overall.metrics,
            market: self.market.metrics,
            market_importances: self
                .market
                .model
                .feature_names()
                .iter()
                .cloned()
                .zip(self.market.model.feature_importances().iter().copied())
                .collect(),
        }
    }
}

/// One-time startup: load the dataset named in `cfg` and fit both models.
pub fn load_and_train(cfg: &AppConfig) -> Result<TrainedModels> {
    let table = dataset::load_players(&cfg.dataset_path)
        .with_context(|| format!("load dataset {}", cfg.dataset_path.display()))?;
    train_models(&table, &cfg.train)
}

pub fn train_models(table: &PlayerTable, cfg: &TrainConfig) -> Result<TrainedModels> {
    let overall = fit_target(table, &OVERALL_FEATURES, OVERALL_TARGET, cfg)
        .context("train overall rating model")?;
    let market = fit_target(table, &MARKET_FEATURES, MARKET_TARGET, cfg)
        .context("train market value model")?;
    Ok(TrainedModels { overall, market })
}

/// Splits, fits and scores one (feature set, target) pair.
pub fn fit_target(
    table: &PlayerTable,
    features: &[&str],
    target: &str,
    cfg: &TrainConfig,
) -> Result<FittedTarget> {
    if features.contains(&target) {
        return Err(anyhow!("target `{target}` is listed among its own features"));
    }
    let x = table
        .matrix(features)
        .ok_or_else(|| anyhow!("table lacks one of {features:?}"))?;
    let y = table
        .column(target)
        .ok_or_else(|| anyhow!("table lacks target column `{target}`"))?;

    let split = train_test_split(y.len(), cfg.test_fraction, cfg.seed);
    let x_train = select(&x, &split.train);
    let y_train = select(&y, &split.train);
    let x_test = select(&x, &split.test);
    let y_test = select(&y, &split.test);

    let mut model = RandomForest::new(cfg.forest);
    model.fit(features, &x_train, &y_train)?;

    let test_predicted = model.predict(&x_test);
    let metrics = metrics::evaluate(&y_test, &test_predicted);
    tracing::info!(
        column = target,
        train = y_train.len(),
        test = y_test.len(),
        mse = metrics.mse,
        r2 = metrics.r2,
        "model evaluated"
    );

    Ok(FittedTarget {
        model,
        metrics,
        test_actual: y_test,
        test_predicted,
    })
}
