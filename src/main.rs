use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph,
    Wrap,
};

use scout_terminal::config::AppConfig;
use scout_terminal::currency::RATES_AS_OF;
use scout_terminal::export;
use scout_terminal::logging;
use scout_terminal::model::{self, TrainedModels};
use scout_terminal::predict::format_thousands;
use scout_terminal::report::{self, ImportanceBar, ScatterPlot};
use scout_terminal::state::{AppState, Screen, SliderForm};

struct App<'a> {
    state: AppState,
    models: &'a TrainedModels,
    importance: Vec<ImportanceBar>,
    scatter: ScatterPlot,
    export_dir: PathBuf,
    should_quit: bool,
}

impl<'a> App<'a> {
    fn new(models: &'a TrainedModels, export_dir: PathBuf) -> Self {
        let mut state = AppState::new();
        state.push_log(format!(
            "[INFO] Models ready: overall R² {:.3}, market R² {:.3}",
            models.overall.metrics.r2, models.market.metrics.r2
        ));
        Self {
            state,
            models,
            importance: report::importance_bars(&models.market.model),
            scatter: report::predicted_vs_actual(&models.market),
            export_dir,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.screen = Screen::Overview,
            KeyCode::Char('2') => self.state.screen = Screen::OverallForm,
            KeyCode::Char('3') => self.state.screen = Screen::MarketForm,
            KeyCode::Char('4') => self.state.screen = Screen::About,
            KeyCode::Tab => self.state.screen = self.state.screen.next(),
            KeyCode::BackTab => self.state.screen = self.state.screen.prev(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('h') | KeyCode::Left => self.state.adjust(-1),
            KeyCode::Char('l') | KeyCode::Right => self.state.adjust(1),
            KeyCode::Char('H') | KeyCode::PageDown => self.state.adjust(-5),
            KeyCode::Char('L') | KeyCode::PageUp => self.state.adjust(5),
            KeyCode::Char('r') => self.state.reset_form(),
            KeyCode::Char('p') | KeyCode::Enter => self.predict(),
            KeyCode::Char('e') => self.export_csv(),
            KeyCode::Char('x') => self.export_xlsx(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn predict(&mut self) {
        let outcome = match self.state.screen {
            Screen::OverallForm => self.state.run_overall_prediction(self.models).map(|_| ()),
            Screen::MarketForm => self.state.run_market_prediction(self.models).map(|_| ()),
            Screen::Overview | Screen::About => return,
        };
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "prediction failed");
            self.state.push_log(format!("[WARN] Prediction failed: {err}"));
        }
    }

    fn export_csv(&mut self) {
        let Some(prediction) = self.state.market_result.as_ref() else {
            self.state
                .push_log("[INFO] Run a market value prediction before exporting");
            return;
        };
        match export::write_prediction_csv(&self.export_dir, prediction) {
            Ok(path) => self
                .state
                .push_log(format!("[INFO] Saved {}", path.display())),
            Err(err) => {
                tracing::warn!(error = %err, "csv export failed");
                self.state.push_log(format!("[WARN] CSV export failed: {err:#}"));
            }
        }
    }

    fn export_xlsx(&mut self) {
        let Some(prediction) = self.state.market_result.as_ref() else {
            self.state
                .push_log("[INFO] Run a market value prediction before exporting");
            return;
        };
        match export::write_prediction_xlsx(&self.export_dir, prediction) {
            Ok(path) => self
                .state
                .push_log(format!("[INFO] Saved {}", path.display())),
            Err(err) => {
                tracing::warn!(error = %err, "xlsx export failed");
                self.state.push_log(format!("[WARN] XLSX export failed: {err:#}"));
            }
        }
    }
}

fn main() -> Result<()> {
    let cfg = AppConfig::from_env();
    if let Err(err) = logging::init_file(&cfg.log_file) {
        eprintln!("[WARN] logging disabled: {err:#}");
    }

    eprintln!(
        "[INFO] training {} trees per model on {}",
        cfg.train.forest.n_trees,
        cfg.dataset_path.display()
    );
    let started = Instant::now();
    let models = match model::load_and_train(&cfg) {
        Ok(models) => models,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "startup failed");
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "models trained");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(&models, cfg.export_dir.clone());
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Overview => render_overview(frame, chunks[1], app),
        Screen::OverallForm => render_overall_form(frame, chunks[1], &app.state),
        Screen::MarketForm => render_market_form(frame, chunks[1], &app.state),
        Screen::About => render_about(frame, chunks[1]),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let tabs = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, screen)| {
            let label = screen_label(*screen);
            if *screen == state.screen {
                format!("[{} {}]", i + 1, label)
            } else {
                format!(" {} {} ", i + 1, label)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let line1 = format!("  (o)  SCOUT TERMINAL | {tabs}");
    let line2 = "  /|\\  Player rating & market value".to_string();
    format!("{line1}\n{line2}")
}

fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Overview => "OVERVIEW",
        Screen::OverallForm => "OVERALL",
        Screen::MarketForm => "MARKET",
        Screen::About => "ABOUT",
    }
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Overview | Screen::About => {
            "1-4/Tab Screens | ? Help | q Quit".to_string()
        }
        Screen::OverallForm => {
            "j/k Move | h/l ±1 | H/L ±5 | Enter Predict | r Reset | Tab Screens | ? Help | q Quit"
                .to_string()
        }
        Screen::MarketForm => {
            "j/k Move | h/l ±1 | H/L ±5 | Enter Predict | e CSV | x XLSX | r Reset | ? Help | q Quit"
                .to_string()
        }
    }
}

fn render_overview(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(area);

    let metrics = Paragraph::new(metrics_text(app.models))
        .block(Block::default().title("Model Performance").borders(Borders::ALL));
    frame.render_widget(metrics, rows[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    frame.render_widget(importance_chart(&app.importance), charts[0]);
    render_scatter(frame, charts[1], &app.scatter);
}

fn metrics_text(models: &TrainedModels) -> String {
    let o = models.overall.metrics;
    let m = models.market.metrics;
    [
        "Overall Rating Prediction".to_string(),
        format!("  R² Score: {:.3}", o.r2),
        format!("  Mean Squared Error: {:.2}", o.mse),
        "Market Value Prediction".to_string(),
        format!("  R² Score: {:.3}", m.r2),
        format!("  Mean Squared Error: ${}", format_thousands(m.mse, 2)),
    ]
    .join("\n")
}

fn importance_chart(bars: &[ImportanceBar]) -> BarChart<'static> {
    // Ascending data, drawn top-down reversed so the strongest feature sits on top.
    let rendered: Vec<Bar<'static>> = bars
        .iter()
        .rev()
        .map(|bar| {
            Bar::default()
                .value((bar.importance * 1000.0).round() as u64)
                .text_value(format!("{:.3}", bar.importance))
                .label(Line::from(bar.feature.clone()))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    BarChart::default()
        .block(
            Block::default()
                .title("Feature Importance (Market Value)")
                .borders(Borders::ALL),
        )
        .data(BarGroup::default().bars(&rendered))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(1000)
}

fn render_scatter(frame: &mut Frame, area: Rect, plot: &ScatterPlot) {
    let datasets = vec![
        Dataset::default()
            .name("test rows")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Magenta))
            .data(&plot.points),
        Dataset::default()
            .name("y = x")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&plot.identity),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title("Predicted vs Actual Market Value")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Actual")
                .bounds(plot.x_bounds)
                .labels(axis_labels(plot.x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title("Predicted")
                .bounds(plot.y_bounds)
                .labels(axis_labels(plot.y_bounds)),
        );
    frame.render_widget(chart, area);
}

fn axis_labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .into_iter()
        .map(|v| Span::raw(compact_number(v)))
        .collect()
}

fn compact_number(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{value:.0}")
    }
}

fn render_overall_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(44)])
        .split(area);

    render_sliders(
        frame,
        columns[0],
        "Inputs for Overall Rating",
        &state.overall_form,
        None,
    );

    let result = match state.overall_result {
        Some(value) => format!("Predicted Overall Rating: {value:.1}"),
        None => "Press Enter to predict".to_string(),
    };
    let panel = Paragraph::new(result)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Prediction").borders(Borders::ALL));
    frame.render_widget(panel, columns[1]);
}

fn render_market_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(44)])
        .split(area);

    render_sliders(
        frame,
        columns[0],
        "Inputs for Market Value",
        &state.market_form,
        Some(state.selected_currency()),
    );

    let text = match &state.market_result {
        Some(p) => [
            format!("Predicted Market Value:\n  {} {}", format_thousands(p.value, 2), p.currency),
            format!(
                "95% interval (tree spread):\n  {} - {} {}",
                format_thousands(p.lower, 2),
                format_thousands(p.upper, 2),
                p.currency
            ),
            format!("e: save {}", export::CSV_FILE_NAME),
            format!("x: save {}", export::XLSX_FILE_NAME),
        ]
        .join("\n\n"),
        None => "Press Enter to predict".to_string(),
    };
    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Prediction").borders(Borders::ALL));
    frame.render_widget(panel, columns[1]);
}

fn render_sliders(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    form: &SliderForm,
    currency: Option<&str>,
) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    const LABEL_W: u16 = 17;
    const VALUE_W: u16 = 5;
    let bar_w = inner.width.saturating_sub(LABEL_W + VALUE_W + 2) as usize;

    let mut lines: Vec<Line> = Vec::with_capacity(form.rows());
    for (idx, slider) in form.sliders.iter().enumerate() {
        let selected = idx == form.selected;
        let style = row_style(selected);
        let marker = if selected { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{marker}{:<w$}", slider.range.label, w = (LABEL_W - 2) as usize),
                style,
            ),
            Span::styled(slider_bar(slider.ratio(), bar_w), Style::default().fg(Color::Green)),
            Span::styled(format!(" {:>4}", slider.value()), style),
        ]));
    }
    if let Some(code) = currency {
        let selected = form.selected >= form.sliders.len();
        let marker = if selected { "> " } else { "  " };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{marker}{:<w$}< {code} >", "Currency", w = (LABEL_W - 2) as usize),
            row_style(selected),
        )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn slider_bar(ratio: f64, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let filled = ((ratio.clamp(0.0, 1.0)) * width as f64).round() as usize;
    let mut bar = String::with_capacity(width * 3);
    for i in 0..width {
        bar.push(if i < filled { '━' } else { '─' });
    }
    bar
}

fn render_about(frame: &mut Frame, area: Rect) {
    let text = [
        "- Predicts a football player's Overall Rating and Market Value using two separate random forest models.".to_string(),
        "- Avoids data leakage: overall_rating is never used to predict itself.".to_string(),
        "- Market value comes with a 95% interval derived from the spread of the individual trees. It is a heuristic, not a calibrated confidence interval.".to_string(),
        format!("- Currency rates are approximate ({RATES_AS_OF}) and never refreshed."),
    ]
    .join("\n\n");
    let about = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("About the Model").borders(Borders::ALL));
    frame.render_widget(about, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Scout Terminal - Help",
        "",
        "Global:",
        "  1-4 / Tab    Switch screen",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Forms:",
        "  j/k or ↑/↓   Select input",
        "  h/l or ←/→   Adjust by 1",
        "  H/L or PgDn/PgUp  Adjust by 5",
        "  Enter / p    Predict",
        "  r            Reset to defaults",
        "",
        "Market form:",
        "  e            Save prediction as CSV",
        "  x            Save prediction as XLSX",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
