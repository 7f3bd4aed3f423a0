use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::features::MARKET_FEATURES;
use crate::predict::MarketPrediction;

pub const CSV_FILE_NAME: &str = "market_value_prediction.csv";
pub const XLSX_FILE_NAME: &str = "market_value_prediction.xlsx";

pub const RESULT_COLUMNS: [&str; 3] = ["Predicted Market Value", "Lower Bound", "Upper Bound"];

pub fn header_row() -> Vec<String> {
    MARKET_FEATURES
        .iter()
        .chain(RESULT_COLUMNS.iter())
        .map(|s| s.to_string())
        .collect()
}

/// Inputs in model order followed by value and bounds, all outputs in the chosen currency.
pub fn value_row(prediction: &MarketPrediction) -> Vec<f64> {
    let mut row = prediction.input.to_vector().values().to_vec();
    row.extend([prediction.value, prediction.lower, prediction.upper]);
    row
}

/// The downloadable artifact: one header line and one data line.
pub fn prediction_csv(prediction: &MarketPrediction) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header_row())
        .context("write csv header")?;
    writer
        .write_record(value_row(prediction).iter().map(|v| format_cell(*v)))
        .context("write csv row")?;
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flush csv buffer: {}", err.error()))
}

pub fn write_prediction_csv(dir: &Path, prediction: &MarketPrediction) -> Result<PathBuf> {
    let bytes = prediction_csv(prediction)?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(CSV_FILE_NAME);
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "prediction csv written");
    Ok(path)
}

pub fn write_prediction_xlsx(dir: &Path, prediction: &MarketPrediction) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(XLSX_FILE_NAME);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Prediction")?;
        write_header(sheet, &header_row())?;
        for (col_idx, value) in value_row(prediction).iter().enumerate() {
            sheet
                .write_number(1, col_idx as u16, *value)
                .with_context(|| format!("write cell (1,{col_idx})"))?;
        }
        sheet
            .write_string(0, header_row().len() as u16, "Currency")
            .context("write currency header")?;
        sheet
            .write_string(1, header_row().len() as u16, &prediction.currency)
            .context("write currency cell")?;
    }

    workbook
        .save(&path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    tracing::info!(path = %path.display(), "prediction workbook written");
    Ok(path)
}

fn write_header(worksheet: &mut Worksheet, header: &[String]) -> Result<()> {
    for (col_idx, value) in header.iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, value)
            .with_context(|| format!("write cell (0,{col_idx})"))?;
    }
    Ok(())
}

// Slider inputs are whole numbers and read better without a trailing ".0".
fn format_cell(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::features::MarketInput;
    use crate::predict::EnsembleSpread;

    fn sample_prediction() -> MarketPrediction {
        let usd = EnsembleSpread::from_predictions(&[1_000_000.0, 3_000_000.0]);
        let eur = usd.scaled(0.93);
        MarketPrediction {
            input: MarketInput::default(),
            currency: "EUR".to_string(),
            rate: 0.93,
            usd,
            value: eur.mean,
            lower: eur.lower,
            upper: eur.upper,
        }
    }

    #[test]
    fn csv_has_header_and_one_row() {
        let bytes = prediction_csv(&sample_prediction()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "age,overall_rating,potential,finishing,short_passing,interceptions,\
             standing_tackle,stamina,Predicted Market Value,Lower Bound,Upper Bound"
        );
        assert!(lines[1].starts_with("25,75,80,60,65,50,55,70,"));
        let cells: Vec<f64> = lines[1].split(',').map(|c| c.parse().unwrap()).collect();
        assert_eq!(cells.len(), 11);
        assert!((cells[8] - 1_860_000.0).abs() < 1e-3);
        assert!(cells[9] < cells[8] && cells[8] < cells[10]);
    }

    #[test]
    fn value_row_matches_prediction() {
        let p = sample_prediction();
        let row = value_row(&p);
        assert_eq!(row.len(), 11);
        assert_eq!(row[8], p.value);
        assert_eq!(row[9], p.lower);
        assert_eq!(row[10], p.upper);
    }

    #[test]
    fn files_land_in_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let p = sample_prediction();
        let csv_path = write_prediction_csv(dir.path(), &p).unwrap();
        assert_eq!(csv_path.file_name().unwrap(), CSV_FILE_NAME);
        assert!(csv_path.exists());

        let xlsx_path = write_prediction_xlsx(&dir.path().join("nested"), &p).unwrap();
        assert!(xlsx_path.exists());
    }
}
