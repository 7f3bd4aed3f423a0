use std::collections::VecDeque;

use chrono::Local;

use crate::currency::CURRENCY_RATES;
use crate::features::{
    self, FeatureRange, MARKET_FEATURES, MarketInput, OVERALL_FEATURES, OverallInput,
};
use crate::model::TrainedModels;
use crate::predict::{self, MarketPrediction, PredictError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Overview,
    OverallForm,
    MarketForm,
    About,
}

impl Screen {
    pub const ALL: [Screen; 4] = [
        Screen::Overview,
        Screen::OverallForm,
        Screen::MarketForm,
        Screen::About,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slider {
    pub range: FeatureRange,
    value: i32,
}

impl Slider {
    pub fn new(range: FeatureRange) -> Self {
        Self {
            range,
            value: range.default.clamp(range.min, range.max),
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn set(&mut self, value: i32) {
        self.value = value.clamp(self.range.min, self.range.max);
    }

    pub fn step(&mut self, delta: i32) {
        self.set(self.value.saturating_add(delta));
    }

    /// Position within the range, 0.0 ..= 1.0.
    pub fn ratio(&self) -> f64 {
        let span = (self.range.max - self.range.min) as f64;
        if span <= 0.0 {
            return 0.0;
        }
        (self.value - self.range.min) as f64 / span
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliderForm {
    pub sliders: Vec<Slider>,
    pub selected: usize,
    /// Extra selectable rows after the sliders (the currency picker on the market form).
    extra_rows: usize,
}

impl SliderForm {
    pub fn new(names: &[&str], extra_rows: usize) -> Self {
        Self {
            sliders: features::ranges(names).into_iter().map(Slider::new).collect(),
            selected: 0,
            extra_rows,
        }
    }

    pub fn rows(&self) -> usize {
        self.sliders.len() + self.extra_rows
    }

    pub fn select_next(&mut self) {
        if self.rows() > 0 {
            self.selected = (self.selected + 1) % self.rows();
        }
    }

    pub fn select_prev(&mut self) {
        if self.rows() > 0 {
            self.selected = (self.selected + self.rows() - 1) % self.rows();
        }
    }

    pub fn selected_slider_mut(&mut self) -> Option<&mut Slider> {
        self.sliders.get_mut(self.selected)
    }

    pub fn reset(&mut self) {
        for slider in &mut self.sliders {
            slider.set(slider.range.default);
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, f64)> {
        self.sliders
            .iter()
            .map(|s| (s.range.name, s.value as f64))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub overall_form: SliderForm,
    pub market_form: SliderForm,
    pub currency_idx: usize,
    pub overall_result: Option<f64>,
    pub market_result: Option<MarketPrediction>,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Overview,
            overall_form: SliderForm::new(&OVERALL_FEATURES, 0),
            market_form: SliderForm::new(&MARKET_FEATURES, 1),
            currency_idx: 0,
            overall_result: None,
            market_result: None,
            help_overlay: false,
            logs: VecDeque::with_capacity(200),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        let stamp = Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("{stamp} {}", msg.into()));
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn active_form(&self) -> Option<&SliderForm> {
        match self.screen {
            Screen::OverallForm => Some(&self.overall_form),
            Screen::MarketForm => Some(&self.market_form),
            Screen::Overview | Screen::About => None,
        }
    }

    fn active_form_mut(&mut self) -> Option<&mut SliderForm> {
        match self.screen {
            Screen::OverallForm => Some(&mut self.overall_form),
            Screen::MarketForm => Some(&mut self.market_form),
            Screen::Overview | Screen::About => None,
        }
    }

    pub fn select_next(&mut self) {
        if let Some(form) = self.active_form_mut() {
            form.select_next();
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(form) = self.active_form_mut() {
            form.select_prev();
        }
    }

    /// Moves the focused slider (or the currency picker) by `delta`. Any edit clears the
    /// previous result of that form.
    pub fn adjust(&mut self, delta: i32) {
        match self.screen {
            Screen::OverallForm => {
                if let Some(slider) = self.overall_form.selected_slider_mut() {
                    slider.step(delta);
                    self.overall_result = None;
                }
            }
            Screen::MarketForm => {
                if let Some(slider) = self.market_form.selected_slider_mut() {
                    slider.step(delta);
                } else {
                    self.cycle_currency(delta.signum());
                }
                self.market_result = None;
            }
            Screen::Overview | Screen::About => {}
        }
    }

    pub fn reset_form(&mut self) {
        match self.screen {
            Screen::OverallForm => {
                self.overall_form.reset();
                self.overall_result = None;
            }
            Screen::MarketForm => {
                self.market_form.reset();
                self.currency_idx = 0;
                self.market_result = None;
            }
            Screen::Overview | Screen::About => {}
        }
    }

    pub fn cycle_currency(&mut self, delta: i32) {
        let n = CURRENCY_RATES.len() as i32;
        self.currency_idx = (self.currency_idx as i32 + delta).rem_euclid(n) as usize;
    }

    pub fn selected_currency(&self) -> &'static str {
        CURRENCY_RATES[self.currency_idx % CURRENCY_RATES.len()].0
    }

    pub fn currency_row_selected(&self) -> bool {
        self.screen == Screen::MarketForm
            && self.market_form.selected >= self.market_form.sliders.len()
    }

    pub fn overall_input(&self) -> OverallInput {
        features::overall_input_from(&self.overall_form.pairs())
    }

    pub fn market_input(&self) -> MarketInput {
        features::market_input_from(&self.market_form.pairs())
    }

    pub fn run_overall_prediction(&mut self, models: &TrainedModels) -> Result<f64, PredictError> {
        let value = predict::predict_overall(models, &self.overall_input())?;
        self.overall_result = Some(value);
        self.push_log(format!("[INFO] Predicted overall rating {value:.1}"));
        Ok(value)
    }

    pub fn run_market_prediction(
        &mut self,
        models: &TrainedModels,
    ) -> Result<&MarketPrediction, PredictError> {
        let currency = self.selected_currency();
        let prediction = predict::predict_market(models, &self.market_input(), currency)?;
        self.push_log(format!(
            "[INFO] Predicted market value {} {}",
            predict::format_thousands(prediction.value, 2),
            prediction.currency
        ));
        let stored = self.market_result.insert(prediction);
        Ok(&*stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliders_clamp_to_their_range() {
        let mut state = AppState::new();
        state.screen = Screen::OverallForm;
        for _ in 0..100 {
            state.adjust(-1);
        }
        assert_eq!(state.overall_form.sliders[0].value(), 16);
        state.adjust(1000);
        assert_eq!(state.overall_form.sliders[0].value(), 45);
        assert_eq!(state.overall_input().age, 45.0);
    }

    #[test]
    fn selection_wraps_over_currency_row() {
        let mut state = AppState::new();
        state.screen = Screen::MarketForm;
        assert_eq!(state.market_form.rows(), 9);
        state.select_prev();
        assert!(state.currency_row_selected());
        state.adjust(1);
        assert_eq!(state.selected_currency(), "EUR");
        state.adjust(-1);
        state.adjust(-1);
        assert_eq!(state.selected_currency(), "THB");
        state.select_next();
        assert!(!state.currency_row_selected());
    }

    #[test]
    fn defaults_feed_the_inputs() {
        let state = AppState::new();
        assert_eq!(state.overall_input(), OverallInput::default());
        assert_eq!(state.market_input(), MarketInput::default());
    }

    #[test]
    fn screens_cycle_both_ways() {
        assert_eq!(Screen::About.next(), Screen::Overview);
        assert_eq!(Screen::Overview.prev(), Screen::About);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = AppState::new();
        state.screen = Screen::MarketForm;
        state.select_next();
        state.adjust(10);
        assert_eq!(state.market_input().overall_rating, 85.0);
        state.reset_form();
        assert_eq!(state.market_input(), MarketInput::default());
    }

    #[test]
    fn log_is_bounded() {
        let mut state = AppState::new();
        for i in 0..250 {
            state.push_log(format!("[INFO] line {i}"));
        }
        assert_eq!(state.logs.len(), 200);
        assert!(state.logs.back().unwrap().ends_with("line 249"));
    }
}
