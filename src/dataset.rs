use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Identifying or leaky columns: required in the file, discarded on load.
pub const DROPPED_COLUMNS: [&str; 3] = ["team_position", "reactions", "player_name"];

/// Source header → name used everywhere downstream.
pub const RENAMED_COLUMNS: [(&str, &str); 2] =
    [("overall", "overall_rating"), ("rating", "market_value")];

const NUMERIC_COLUMNS: [&str; 9] = [
    "age",
    "potential",
    "finishing",
    "short_passing",
    "interceptions",
    "standing_tackle",
    "stamina",
    "overall",
    "rating",
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found at {0}")]
    NotFound(PathBuf),
    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("row {row}: column `{column}` has non-numeric value {value:?}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("dataset has no data rows")]
    Empty,
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to open dataset: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub age: f64,
    pub potential: f64,
    pub finishing: f64,
    pub short_passing: f64,
    pub interceptions: f64,
    pub standing_tackle: f64,
    pub stamina: f64,
    pub overall_rating: f64,
    pub market_value: f64,
}

impl PlayerRecord {
    /// Looks a field up by its post-rename column name.
    pub fn get(&self, column: &str) -> Option<f64> {
        match column {
            "age" => Some(self.age),
            "potential" => Some(self.potential),
            "finishing" => Some(self.finishing),
            "short_passing" => Some(self.short_passing),
            "interceptions" => Some(self.interceptions),
            "standing_tackle" => Some(self.standing_tackle),
            "stamina" => Some(self.stamina),
            "overall_rating" => Some(self.overall_rating),
            "market_value" => Some(self.market_value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerTable {
    /// Retained column names in file order, after the renames.
    pub columns: Vec<String>,
    pub rows: Vec<PlayerRecord>,
}

impl PlayerTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if !self.has_column(name) {
            return None;
        }
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    /// Rows projected onto `columns`, in that order.
    pub fn matrix(&self, columns: &[&str]) -> Option<Vec<Vec<f64>>> {
        self.rows
            .iter()
            .map(|r| columns.iter().map(|c| r.get(c)).collect::<Option<Vec<f64>>>())
            .collect()
    }
}

pub fn load_players(path: &Path) -> Result<PlayerTable, DatasetError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    let table = read_players(file)?;
    tracing::info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "loaded player dataset"
    );
    Ok(table)
}

pub fn read_players<R: Read>(reader: R) -> Result<PlayerTable, DatasetError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let missing: Vec<String> = DROPPED_COLUMNS
        .iter()
        .chain(NUMERIC_COLUMNS.iter())
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns(missing));
    }

    let position = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
    let idx: Vec<usize> = NUMERIC_COLUMNS.iter().map(|c| position(c)).collect();

    let columns: Vec<String> = headers
        .iter()
        .filter(|h| !DROPPED_COLUMNS.contains(&h.as_str()))
        .map(|h| rename(h).to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, record) in rdr.records().enumerate() {
        let record = record?;
        let mut values = [0.0_f64; NUMERIC_COLUMNS.len()];
        for (slot, (&col_idx, name)) in values.iter_mut().zip(idx.iter().zip(NUMERIC_COLUMNS)) {
            let raw = record.get(col_idx).unwrap_or("");
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DatasetError::InvalidValue {
                    row: row_no + 1,
                    column: rename(name).to_string(),
                    value: raw.to_string(),
                })?;
        }
        let [
            age,
            potential,
            finishing,
            short_passing,
            interceptions,
            standing_tackle,
            stamina,
            overall_rating,
            market_value,
        ] = values;
        rows.push(PlayerRecord {
            age,
            potential,
            finishing,
            short_passing,
            interceptions,
            standing_tackle,
            stamina,
            overall_rating,
            market_value,
        });
    }

    if rows.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(PlayerTable { columns, rows })
}

fn rename(header: &str) -> &str {
    RENAMED_COLUMNS
        .iter()
        .find(|(from, _)| *from == header)
        .map(|(_, to)| *to)
        .unwrap_or(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
player_name,team_position,age,overall,potential,finishing,short_passing,interceptions,standing_tackle,stamina,reactions,rating,club
A. Keeper,GK,31,82,84,12,35,20,15,40,80,12000000,North FC
B. Winger,LW,22,76,88,74,72,30,28,81,71,25500000,South FC
";

    #[test]
    fn drops_identifying_columns_and_renames() {
        let table = read_players(SAMPLE.as_bytes()).expect("sample parses");
        for dropped in DROPPED_COLUMNS {
            assert!(!table.has_column(dropped), "{dropped} leaked");
        }
        assert!(table.has_column("overall_rating"));
        assert!(table.has_column("market_value"));
        assert!(!table.has_column("overall"));
        assert!(!table.has_column("rating"));
        assert!(table.has_column("club"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].overall_rating, 76.0);
        assert_eq!(table.rows[1].market_value, 25_500_000.0);
        assert_eq!(table.column("age"), Some(vec![31.0, 22.0]));
        assert_eq!(table.column("club"), None);
    }

    #[test]
    fn matrix_follows_requested_order() {
        let table = read_players(SAMPLE.as_bytes()).unwrap();
        let m = table.matrix(&["stamina", "age"]).unwrap();
        assert_eq!(m, vec![vec![40.0, 31.0], vec![81.0, 22.0]]);
        assert!(table.matrix(&["reactions"]).is_none());
    }

    #[test]
    fn missing_columns_are_listed() {
        let raw = "player_name,age,overall,rating\nX,20,70,1000\n";
        let err = read_players(raw.as_bytes()).unwrap_err();
        match err {
            DatasetError::MissingColumns(cols) => {
                assert!(cols.contains(&"team_position".to_string()));
                assert!(cols.contains(&"stamina".to_string()));
                assert!(!cols.contains(&"age".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_cells_are_fatal() {
        let raw = SAMPLE.replace("12000000", "twelve million");
        let err = read_players(raw.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InvalidValue { row: 1, ref column, .. } if column == "market_value"
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let header = SAMPLE.lines().next().unwrap();
        assert!(matches!(
            read_players(header.as_bytes()),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let err = load_players(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }
}
