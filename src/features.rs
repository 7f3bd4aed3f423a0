use serde::Serialize;

/// Inputs of the overall-rating model. Must never contain `overall_rating` or `market_value`.
pub const OVERALL_FEATURES: [&str; 7] = [
    "age",
    "potential",
    "finishing",
    "short_passing",
    "interceptions",
    "standing_tackle",
    "stamina",
];

/// Inputs of the market-value model; `overall_rating` is allowed here.
pub const MARKET_FEATURES: [&str; 8] = [
    "age",
    "overall_rating",
    "potential",
    "finishing",
    "short_passing",
    "interceptions",
    "standing_tackle",
    "stamina",
];

pub const OVERALL_TARGET: &str = "overall_rating";
pub const MARKET_TARGET: &str = "market_value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRange {
    pub name: &'static str,
    pub label: &'static str,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

const fn range(
    name: &'static str,
    label: &'static str,
    min: i32,
    max: i32,
    default: i32,
) -> FeatureRange {
    FeatureRange {
        name,
        label,
        min,
        max,
        default,
    }
}

pub const FEATURE_RANGES: [FeatureRange; 8] = [
    range("age", "Age", 16, 45, 25),
    range("overall_rating", "Overall Rating", 40, 99, 75),
    range("potential", "Potential", 40, 99, 80),
    range("finishing", "Finishing", 0, 99, 60),
    range("short_passing", "Short Passing", 0, 99, 65),
    range("interceptions", "Interceptions", 0, 99, 50),
    range("standing_tackle", "Standing Tackle", 0, 99, 55),
    range("stamina", "Stamina", 0, 99, 70),
];

pub fn range_for(name: &str) -> Option<FeatureRange> {
    FEATURE_RANGES.iter().find(|r| r.name == name).copied()
}

pub fn ranges(names: &[&str]) -> Vec<FeatureRange> {
    names.iter().filter_map(|n| range_for(n)).collect()
}

/// Named, ordered feature values. The forest checks the names against what it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    names: Vec<&'static str>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallInput {
    pub age: f64,
    pub potential: f64,
    pub finishing: f64,
    pub short_passing: f64,
    pub interceptions: f64,
    pub standing_tackle: f64,
    pub stamina: f64,
}

impl OverallInput {
    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector {
            names: OVERALL_FEATURES.to_vec(),
            values: vec![
                self.age,
                self.potential,
                self.finishing,
                self.short_passing,
                self.interceptions,
                self.standing_tackle,
                self.stamina,
            ],
        }
    }
}

impl Default for OverallInput {
    fn default() -> Self {
        Self {
            age: 25.0,
            potential: 80.0,
            finishing: 60.0,
            short_passing: 65.0,
            interceptions: 50.0,
            standing_tackle: 55.0,
            stamina: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketInput {
    pub age: f64,
    pub overall_rating: f64,
    pub potential: f64,
    pub finishing: f64,
    pub short_passing: f64,
    pub interceptions: f64,
    pub standing_tackle: f64,
    pub stamina: f64,
}

impl MarketInput {
    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector {
            names: MARKET_FEATURES.to_vec(),
            values: vec![
                self.age,
                self.overall_rating,
                self.potential,
                self.finishing,
                self.short_passing,
                self.interceptions,
                self.standing_tackle,
                self.stamina,
            ],
        }
    }
}

impl Default for MarketInput {
    fn default() -> Self {
        Self {
            age: 25.0,
            overall_rating: 75.0,
            potential: 80.0,
            finishing: 60.0,
            short_passing: 65.0,
            interceptions: 50.0,
            standing_tackle: 55.0,
            stamina: 70.0,
        }
    }
}

/// Builds the input from `(name, value)` pairs, falling back to slider defaults for absent names.
pub fn overall_input_from(values: &[(&str, f64)]) -> OverallInput {
    let pick = |name: &str, fallback: f64| lookup(values, name).unwrap_or(fallback);
    let d = OverallInput::default();
    OverallInput {
        age: pick("age", d.age),
        potential: pick("potential", d.potential),
        finishing: pick("finishing", d.finishing),
        short_passing: pick("short_passing", d.short_passing),
        interceptions: pick("interceptions", d.interceptions),
        standing_tackle: pick("standing_tackle", d.standing_tackle),
        stamina: pick("stamina", d.stamina),
    }
}

pub fn market_input_from(values: &[(&str, f64)]) -> MarketInput {
    let pick = |name: &str, fallback: f64| lookup(values, name).unwrap_or(fallback);
    let d = MarketInput::default();
    MarketInput {
        age: pick("age", d.age),
        overall_rating: pick("overall_rating", d.overall_rating),
        potential: pick("potential", d.potential),
        finishing: pick("finishing", d.finishing),
        short_passing: pick("short_passing", d.short_passing),
        interceptions: pick("interceptions", d.interceptions),
        standing_tackle: pick("standing_tackle", d.standing_tackle),
        stamina: pick("stamina", d.stamina),
    }
}

fn lookup(values: &[(&str, f64)], name: &str) -> Option<f64> {
    values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_features_exclude_leaky_columns() {
        assert!(!OVERALL_FEATURES.contains(&OVERALL_TARGET));
        assert!(!OVERALL_FEATURES.contains(&MARKET_TARGET));
        assert!(!MARKET_FEATURES.contains(&MARKET_TARGET));
    }

    #[test]
    fn market_features_are_overall_plus_rating() {
        assert_eq!(MARKET_FEATURES.len(), OVERALL_FEATURES.len() + 1);
        for f in OVERALL_FEATURES {
            assert!(MARKET_FEATURES.contains(&f));
        }
        assert!(MARKET_FEATURES.contains(&"overall_rating"));
    }

    #[test]
    fn vectors_follow_fit_order() {
        let v = MarketInput::default().to_vector();
        assert_eq!(v.names(), &MARKET_FEATURES);
        assert_eq!(v.get("overall_rating"), Some(75.0));
        assert_eq!(v.values()[1], 75.0);

        let o = OverallInput::default().to_vector();
        assert_eq!(o.names(), &OVERALL_FEATURES);
        assert_eq!(o.get("overall_rating"), None);
    }

    #[test]
    fn slider_ranges_cover_every_feature() {
        assert_eq!(ranges(&MARKET_FEATURES).len(), 8);
        let age = range_for("age").unwrap();
        assert_eq!((age.min, age.max, age.default), (16, 45, 25));
        let rating = range_for("overall_rating").unwrap();
        assert_eq!((rating.min, rating.max, rating.default), (40, 99, 75));
        assert_eq!(range_for("stamina").map(|r| r.name), Some("stamina"));
        assert!(range_for("market_value").is_none());
    }

    #[test]
    fn defaults_agree_with_slider_defaults() {
        let d = MarketInput::default().to_vector();
        for r in ranges(&MARKET_FEATURES) {
            assert_eq!(d.get(r.name), Some(r.default as f64), "{}", r.name);
        }
    }

    #[test]
    fn partial_pairs_fill_from_defaults() {
        let input = overall_input_from(&[("age", 30.0), ("stamina", 90.0)]);
        assert_eq!(input.age, 30.0);
        assert_eq!(input.stamina, 90.0);
        assert_eq!(input.potential, 80.0);
    }
}
