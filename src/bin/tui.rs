//! Live terminal view of a simulated oscillometric measurement.
//!
//! Usage:
//!   cargo run --bin tui
//!
//! Keys
//! ----
//!   r        restart the measurement
//!   +  / =   zoom out (increase oscillation scale)
//!   -        zoom in  (decrease oscillation scale)
//!   q / Esc  quit

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use oscillo_bp::constants::{SAMPLE_RATE_HZ, TOTAL_SECONDS};
use oscillo_bp::monitor::{Monitor, MonitorConfig, MonitorHandle};
use oscillo_bp::report::format_heart_rate;
use oscillo_bp::simulator::{CuffProfile, SimulatedCuff};
use oscillo_bp::types::{AcquisitionPhase, BloodPressure, MeasurementEvent, Reading};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Width of the scrolling waveform window in seconds.
const WINDOW_SECS: f64 = 4.0;

/// Number of oscillation samples retained; fills `WINDOW_SECS`.
const BUF_SIZE: usize = (WINDOW_SECS * SAMPLE_RATE_HZ as f64) as usize; // 120

/// Oscillation Y-axis half-ranges the user can cycle through with `+` / `-`.
const Y_SCALES: &[f64] = &[0.5, 1.0, 2.0, 3.0, 5.0, 10.0];

/// Index into `Y_SCALES` at start-up; fits the default simulated profile.
const DEFAULT_SCALE: usize = 3;

/// Braille spinner frames cycled at ~100 ms intervals while measuring.
const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── App state (shared with the event task via Arc<Mutex<_>>) ──────────────────

pub struct App {
    osc: VecDeque<f64>,
    pub pressure: Option<f64>,
    pub phase: AcquisitionPhase,
    pub peaks: u32,
    pub readings: Vec<Reading>,
    pub result: Option<BloodPressure>,
    /// Set when the event channel closed without a result.
    pub aborted: bool,
    /// Bumped on every restart; events from older cycles are ignored.
    generation: u64,
    scale_idx: usize,
}

impl App {
    fn new() -> Self {
        Self {
            osc: VecDeque::with_capacity(BUF_SIZE + 1),
            pressure: None,
            phase: AcquisitionPhase::WaitingForSignal,
            peaks: 0,
            readings: Vec::with_capacity(TOTAL_SECONDS),
            result: None,
            aborted: false,
            generation: 0,
            scale_idx: DEFAULT_SCALE,
        }
    }

    /// Forget everything from the previous cycle but keep UI settings.
    /// Returns the generation of the new cycle.
    fn reset(&mut self) -> u64 {
        let scale_idx = self.scale_idx;
        let generation = self.generation + 1;
        *self = Self::new();
        self.scale_idx = scale_idx;
        self.generation = generation;
        generation
    }

    /// Apply one event from cycle `generation`.  Returns `false` once that
    /// cycle has been replaced.
    fn apply(&mut self, generation: u64, ev: MeasurementEvent) -> bool {
        if generation != self.generation {
            return false;
        }
        match ev {
            MeasurementEvent::PhaseChanged(phase) => self.phase = phase,
            MeasurementEvent::Sample { sample, .. } => {
                self.pressure = Some(sample.pressure);
                self.push_oscillation(sample.oscillometric);
            }
            MeasurementEvent::Peak { count, .. } => self.peaks = count,
            MeasurementEvent::Reading { reading, .. } => self.readings.push(reading),
            MeasurementEvent::Completed(bp) => self.result = Some(bp),
        }
        true
    }

    /// The event stream of cycle `generation` ended.
    fn close(&mut self, generation: u64) {
        if generation == self.generation && self.result.is_none() {
            self.aborted = true;
        }
    }

    fn push_oscillation(&mut self, v: f64) {
        self.osc.push_back(v);
        while self.osc.len() > BUF_SIZE {
            self.osc.pop_front();
        }
    }

    fn y_range(&self) -> f64 {
        Y_SCALES[self.scale_idx]
    }

    fn scale_up(&mut self) {
        if self.scale_idx + 1 < Y_SCALES.len() {
            self.scale_idx += 1;
        }
    }

    fn scale_down(&mut self) {
        if self.scale_idx > 0 {
            self.scale_idx -= 1;
        }
    }
}

// ── Measurement plumbing ──────────────────────────────────────────────────────

/// Copy monitor events of cycle `generation` into `app` until the channel
/// closes or a restart makes the cycle stale.
fn spawn_event_task(
    mut rx: tokio::sync::mpsc::Receiver<MeasurementEvent>,
    app: Arc<Mutex<App>>,
    generation: u64,
) {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            if !app.lock().unwrap().apply(generation, ev) {
                return;
            }
        }
        app.lock().unwrap().close(generation);
    });
}

/// Reset the shared state and start a fresh simulated cycle.
fn start_measurement(app: &Arc<Mutex<App>>) -> Result<MonitorHandle> {
    let generation = app.lock().unwrap().reset();
    let cuff = SimulatedCuff::new(CuffProfile::default())?;
    let (rx, handle) = Monitor::new(MonitorConfig::default()).start(cuff);
    spawn_event_task(rx, Arc::clone(app), generation);
    Ok(handle)
}

// ── Drawing ───────────────────────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let root = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(4),
        Constraint::Length(3),
    ])
    .split(area);
    let body = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(root[1]);

    draw_header(frame, root[0], app);
    draw_waveform(frame, body[0], app);
    draw_envelope(frame, body[1], app);
    draw_result(frame, root[2], app);
    draw_footer(frame, root[3]);
}

fn spinner_str() -> &'static str {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    SPINNER[(ms / 100) as usize % SPINNER.len()]
}

/// Status bar: title, phase (with spinner while active), cuff pressure,
/// peak count and reading progress.
fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (label, color) = match app.phase {
        _ if app.aborted => ("■ Stopped".to_owned(), Color::Red),
        AcquisitionPhase::Done => ("● Done".to_owned(), Color::Green),
        AcquisitionPhase::Sampling { .. } => {
            (format!("{} {}", spinner_str(), app.phase.label()), Color::Cyan)
        }
        _ => (format!("{} {}", spinner_str(), app.phase.label()), Color::Yellow),
    };

    let pressure = app
        .pressure
        .map(|p| format!("Cuff {p:5.1} mmHg"))
        .unwrap_or_else(|| "Cuff N/A".into());
    let progress = format!("{}/{} s", app.readings.len(), TOTAL_SECONDS);
    let peaks = format!("{} peaks", app.peaks);

    let line = Line::from(vec![
        Span::styled(
            " Oscillometric BP ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        sep(),
        Span::styled(pressure, Style::default().fg(Color::White)),
        sep(),
        Span::styled(progress, Style::default().fg(Color::LightBlue)),
        sep(),
        Span::styled(peaks, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ]);

    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[inline]
fn sep<'a>() -> Span<'a> {
    Span::styled(" │ ", Style::default().fg(Color::DarkGray))
}

/// Scrolling oscillometric trace, clamped to the current Y window so
/// ratatui does not drop out-of-range points.
fn draw_waveform(frame: &mut Frame, area: Rect, app: &App) {
    let y_range = app.y_range();
    let data: Vec<(f64, f64)> = app
        .osc
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 / SAMPLE_RATE_HZ as f64, v.clamp(-y_range, y_range)))
        .collect();

    let y_labels: Vec<String> = [-1.0, 0.0, 1.0]
        .iter()
        .map(|&f| format!("{:+.1}", f * y_range))
        .collect();
    let x_labels = vec![
        "0s".to_string(),
        format!("{:.0}s", WINDOW_SECS / 2.0),
        format!("{:.0}s", WINDOW_SECS),
    ];

    let chart = Chart::new(vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data)])
    .block(
        Block::default()
            .title(Span::styled(
                " Oscillation ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL),
    )
    .x_axis(
        Axis::default()
            .bounds([0.0, WINDOW_SECS])
            .labels(x_labels)
            .style(Style::default().fg(Color::DarkGray)),
    )
    .y_axis(
        Axis::default()
            .bounds([-y_range, y_range])
            .labels(y_labels)
            .style(Style::default().fg(Color::DarkGray)),
    );

    frame.render_widget(chart, area);
}

/// One bar per completed reading.  Once the result is in, the bars chosen
/// for SBP, MAP and DBP are highlighted.
fn draw_envelope(frame: &mut Frame, area: Rect, app: &App) {
    let bars: Vec<Bar> = app
        .readings
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let color = match &app.result {
                Some(bp) if i == bp.max_amplitude_index => Color::Green,
                Some(bp) if i == bp.systolic_index => Color::Red,
                Some(bp) if i == bp.diastolic_index => Color::Blue,
                _ => Color::Yellow,
            };
            Bar::default()
                .value((r.amplitude * 1000.0).round() as u64)
                .text_value(String::new())
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .title(Span::styled(
                    " Amplitude envelope ",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(1)
        .bar_gap(0);

    frame.render_widget(chart, area);
}

fn draw_result(frame: &mut Frame, area: Rect, app: &App) {
    let lines = match &app.result {
        Some(bp) => vec![
            Line::from(vec![
                Span::raw(" "),
                Span::styled("SBP ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:.0}", bp.systolic),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::raw("   "),
                Span::styled("DBP ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:.0}", bp.diastolic),
                    Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                ),
                Span::raw("   "),
                Span::styled("MAP ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:.0}", bp.mean_arterial),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" mmHg   "),
                Span::styled("HR ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format_heart_rate(bp.heart_rate_bpm),
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                format!(
                    " max amplitude {:.3} at reading {}  │  thresholds {:.3} / {:.3}",
                    bp.max_amplitude,
                    bp.max_amplitude_index,
                    bp.systolic_threshold,
                    bp.diastolic_threshold
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None if app.aborted => vec![Line::from(Span::styled(
            " Measurement stopped before completion. Press r to retry.",
            Style::default().fg(Color::Red),
        ))],
        None => vec![Line::from(Span::styled(
            " Measuring …",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Result ")),
        area,
    );
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let keys = Line::from(vec![
        Span::raw(" "),
        key("[r]"),
        Span::raw("Restart  "),
        key("[+]"),
        Span::raw("Scale↑  "),
        key("[-]"),
        Span::raw("Scale↓  "),
        key("[q]"),
        Span::raw("Quit"),
    ]);
    frame.render_widget(
        Paragraph::new(keys).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[inline]
fn key(s: &str) -> Span<'_> {
    Span::styled(
        s,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    use std::io::IsTerminal as _;
    if !io::stdout().is_terminal() {
        eprintln!("Error: the oscillo-bp tui requires a real terminal (TTY).");
        eprintln!("Use the `oscillo-bp` binary for piped or redirected output.");
        std::process::exit(1);
    }

    // ── Logging ─────────────────────────────────────────────────────────────
    // Write logs to a file so they never interfere with the TUI display.
    //   RUST_LOG=debug cargo run --bin tui
    {
        use std::fs::File;
        if let Ok(file) = File::create("oscillo-bp-tui.log") {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
    }

    let app = Arc::new(Mutex::new(App::new()));
    let mut handle = start_measurement(&app)?;

    // ── Terminal setup ────────────────────────────────────────────────────────
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let tick = Duration::from_millis(33);

    // ── Main loop ─────────────────────────────────────────────────────────────
    loop {
        {
            let s = app.lock().unwrap();
            terminal.draw(|f| draw(f, &s))?;
        }

        if !event::poll(tick)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        // Raw mode delivers Ctrl+C as a key event.
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
            && key.code == KeyCode::Char('c');
        if ctrl_c {
            break;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('r') => {
                handle.stop();
                handle = start_measurement(&app)?;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => app.lock().unwrap().scale_up(),
            KeyCode::Char('-') => app.lock().unwrap().scale_down(),
            _ => {}
        }
    }

    // ── Teardown ──────────────────────────────────────────────────────────────
    handle.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_event(index: usize) -> MeasurementEvent {
        MeasurementEvent::Reading {
            index,
            reading: Reading {
                amplitude: 1.0,
                pressure: 120.0,
            },
        }
    }

    #[test]
    fn stale_cycle_cannot_touch_the_new_one() {
        let mut app = App::new();
        let old = app.reset();
        app.scale_up();
        let current = app.reset();
        assert_ne!(old, current);
        assert_eq!(app.scale_idx, DEFAULT_SCALE + 1);

        assert!(!app.apply(old, reading_event(0)));
        app.close(old);
        assert!(app.readings.is_empty());
        assert!(!app.aborted);

        assert!(app.apply(current, reading_event(0)));
        assert_eq!(app.readings.len(), 1);
        app.close(current);
        assert!(app.aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_is_not_reported_as_stopped() {
        let app = Arc::new(Mutex::new(App::new()));
        let handle = start_measurement(&app).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        handle.stop();
        let handle = start_measurement(&app).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        {
            let s = app.lock().unwrap();
            assert!(!s.aborted);
            assert!(s.result.is_none());
            assert!(s.readings.is_empty());
        }

        handle.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(app.lock().unwrap().aborted);
    }
}
