use serde::Serialize;
use thiserror::Error;

use crate::currency::{self, CurrencyError};
use crate::features::{FeatureVector, MarketInput, OverallInput};
use crate::forest::{ModelError, RandomForest};
use crate::model::TrainedModels;

/// z-score for a two-sided 95% normal interval.
pub const Z_95: f64 = 1.96;

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// Spread of the individual tree predictions for one input.
///
/// This treats tree disagreement as if it were a predictive distribution. It is a rough
/// indication of model uncertainty, not a calibrated confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnsembleSpread {
    pub mean: f64,
    pub std: f64,
    pub lower: f64,
    pub upper: f64,
}

impl EnsembleSpread {
    pub fn from_predictions(per_tree: &[f64]) -> Self {
        if per_tree.is_empty() {
            return Self {
                mean: 0.0,
                std: 0.0,
                lower: 0.0,
                upper: 0.0,
            };
        }
        let n = per_tree.len() as f64;
        let mean = per_tree.iter().sum::<f64>() / n;
        // Population deviation (divide by n) over the trees.
        let std = (per_tree.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n).sqrt();
        Self {
            mean,
            std,
            lower: mean - Z_95 * std,
            upper: mean + Z_95 * std,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            std: self.std * factor,
            lower: self.lower * factor,
            upper: self.upper * factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPrediction {
    pub input: MarketInput,
    pub currency: String,
    pub rate: f64,
    pub usd: EnsembleSpread,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

pub fn predict_overall(models: &TrainedModels, input: &OverallInput) -> Result<f64, PredictError> {
    predict_vector(&models.overall.model, &input.to_vector())
}

pub fn predict_market(
    models: &TrainedModels,
    input: &MarketInput,
    currency_code: &str,
) -> Result<MarketPrediction, PredictError> {
    let rate = currency::rate(currency_code)?;
    let vector = input.to_vector();
    let usd = market_spread(&models.market.model, &vector)?;
    let converted = usd.scaled(rate);

    tracing::debug!(
        currency = currency_code,
        mean_usd = usd.mean,
        std_usd = usd.std,
        "market value predicted"
    );

    Ok(MarketPrediction {
        input: *input,
        currency: currency_code.trim().to_ascii_uppercase(),
        rate,
        usd,
        value: converted.mean,
        lower: converted.lower,
        upper: converted.upper,
    })
}

pub fn predict_vector(model: &RandomForest, vector: &FeatureVector) -> Result<f64, PredictError> {
    model.check_features(vector.names())?;
    Ok(model.predict_one(vector.values()))
}

pub fn market_spread(
    model: &RandomForest,
    vector: &FeatureVector,
) -> Result<EnsembleSpread, PredictError> {
    model.check_features(vector.names())?;
    Ok(EnsembleSpread::from_predictions(
        &model.predict_per_tree(vector.values()),
    ))
}

/// `1234567.891, 2` → `"1,234,567.89"`.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
