use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use scout_terminal::config::AppConfig;
use scout_terminal::export;
use scout_terminal::features::{self, range_for};
use scout_terminal::logging;
use scout_terminal::model;
use scout_terminal::predict::{self, format_thousands};
use scout_terminal::report;

fn main() -> Result<()> {
    logging::init_stderr();

    let mut cfg = AppConfig::from_env();
    if let Some(path) = parse_path_arg("--data") {
        cfg.dataset_path = path;
    }
    if let Some(trees) = parse_usize_arg("--trees") {
        cfg.train.forest.n_trees = trees.max(1);
    }
    if let Some(seed) = parse_u64_arg("--seed") {
        cfg.train.seed = seed;
        cfg.train.forest.seed = seed;
    }

    let models = model::load_and_train(&cfg)?;

    if has_flag("--json") {
        let summary = models.summary();
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize metrics summary")?
        );
    } else {
        let o = models.overall.metrics;
        let m = models.market.metrics;
        println!("Overall Rating Prediction");
        println!("  R² Score: {:.3}", o.r2);
        println!("  Mean Squared Error: {:.2}", o.mse);
        println!("Market Value Prediction");
        println!("  R² Score: {:.3}", m.r2);
        println!("  Mean Squared Error: ${}", format_thousands(m.mse, 2));
        println!("Feature Importance (Market Value, ascending)");
        for bar in report::importance_bars(&models.market.model) {
            println!("  {:<16} {:.4}", bar.feature, bar.importance);
        }
    }

    if let Some(raw) = parse_string_arg("--overall") {
        let pairs = parse_pairs(&raw)?;
        let input = features::overall_input_from(&borrowed(&pairs));
        let value = predict::predict_overall(&models, &input)?;
        println!("Predicted Overall Rating: {value:.1}");
    }

    if let Some(raw) = parse_string_arg("--market") {
        let pairs = parse_pairs(&raw)?;
        let input = features::market_input_from(&borrowed(&pairs));
        let currency = parse_string_arg("--currency").unwrap_or_else(|| "USD".to_string());
        let prediction = predict::predict_market(&models, &input, &currency)?;
        println!(
            "Predicted Market Value: {} {}",
            format_thousands(prediction.value, 2),
            prediction.currency
        );
        println!(
            "95% Confidence Interval: {} - {} {}",
            format_thousands(prediction.lower, 2),
            format_thousands(prediction.upper, 2),
            prediction.currency
        );

        if let Some(dir) = parse_path_arg("--out") {
            let path = if has_flag("--xlsx") {
                export::write_prediction_xlsx(&dir, &prediction)?
            } else {
                export::write_prediction_csv(&dir, &prediction)?
            };
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

/// `"age=25, potential=80"` → pairs, each value clamped to its slider range.
fn parse_pairs(raw: &str) -> Result<Vec<(String, f64)>> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| anyhow!("expected name=value, got {part:?}"))?;
        let name = name.trim();
        let range = range_for(name).ok_or_else(|| anyhow!("unknown feature {name:?}"))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid number for {name}"))?;
        let clamped = value.clamp(range.min as f64, range.max as f64);
        if clamped != value {
            tracing::warn!(feature = name, value, clamped, "input clamped to slider range");
        }
        out.push((name.to_string(), clamped));
    }
    Ok(out)
}

fn borrowed(pairs: &[(String, f64)]) -> Vec<(&str, f64)> {
    pairs.iter().map(|(n, v)| (n.as_str(), *v)).collect()
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&format!("{name}="))
            && !v.trim().is_empty()
        {
            return Some(v.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_string_arg(name).and_then(|v| v.parse::<usize>().ok())
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_string_arg(name).and_then(|v| v.parse::<u64>().ok())
}
