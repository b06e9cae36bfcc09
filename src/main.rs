mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use cubik::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore, StoreBackend},
    notify::{QueuedNotifier, Signal},
    random::RngSource,
    runtime::{CrosstermEventSource, EventSource, Runner, TimerEvent},
    scramble::ScrambleGenerator,
    session::{SolveSession, TimerState},
    stats::SessionStats,
    store::{export_csv, JsonSolveStore, SolveStore, SqliteSolveStore},
    util::{format_average, format_time},
};
use rand::rngs::StdRng;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Redraw cadence when neither inspection nor solving is ticking
const IDLE_TICK_MS: u64 = 250;

/// speedcubing timer with inspection, scrambles, and rolling averages
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal speedcubing timer: WCA-style inspection countdown, random scrambles, and ao5/ao12 statistics kept across sessions."
)]
pub struct Cli {
    /// inspection time in seconds
    #[clap(short = 'i', long)]
    inspection_secs: Option<u64>,

    /// do not beep during the last seconds of inspection
    #[clap(long)]
    no_beep: bool,

    /// where solve history is kept
    #[clap(long, value_enum)]
    store: Option<StoreBackend>,

    /// path of the history file (json) or database (sqlite)
    #[clap(long)]
    history_file: Option<PathBuf>,

    /// print scrambles and exit
    #[clap(long, value_name = "COUNT", num_args = 0..=1, default_missing_value = "1")]
    scramble: Option<usize>,

    /// print statistics for the saved history and exit
    #[clap(long)]
    stats: bool,

    /// export the saved history as csv and exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// remember the effective settings as defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the stored config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(secs) = self.inspection_secs {
            config.inspection_secs = secs;
        }
        if self.no_beep {
            config.beep = false;
        }
        if let Some(store) = self.store {
            config.store = store;
        }
        config
    }
}

pub struct App {
    pub session: SolveSession<SystemClock, Box<dyn SolveStore>, QueuedNotifier>,
    pub generator: ScrambleGenerator<RngSource<StdRng>>,
    pub beep: bool,
    /// last storage warning, shown under the timer
    pub status: Option<String>,
}

impl App {
    pub fn new(config: &Config, store: Box<dyn SolveStore>) -> Self {
        let mut generator = ScrambleGenerator::new(RngSource::from_entropy());
        let scramble = generator.generate();
        let session = SolveSession::new(
            config.session_config(),
            SystemClock::new(),
            store,
            QueuedNotifier::new(),
            scramble,
        );

        let mut app = Self {
            session,
            generator,
            beep: config.beep,
            status: None,
        };
        // a failed load is reported through the notifier during construction
        app.drain_signals();
        app
    }

    pub fn toggle(&mut self) {
        if self.session.toggle() == TimerState::Complete {
            self.new_scramble();
        }
    }

    /// Only between solves; a running cycle keeps its scramble anyway
    pub fn new_scramble(&mut self) {
        if matches!(
            self.session.state(),
            TimerState::Ready | TimerState::Complete
        ) {
            let scramble = self.generator.generate();
            self.session.set_scramble(scramble);
        }
    }

    /// Returns true when a warning beep is due
    pub fn drain_signals(&mut self) -> bool {
        let mut ring = false;
        for signal in self.session.notifier_mut().drain() {
            match signal {
                Signal::InspectionWarning => ring = self.beep,
                Signal::StorageWarning(msg) => self.status = Some(msg),
            }
        }
        ring
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
    }

    init_logging();

    if let Some(count) = cli.scramble {
        let mut generator = ScrambleGenerator::new(RngSource::from_entropy());
        for _ in 0..count {
            let scramble = generator.generate();
            println!("{} ({} moves, {})", scramble, scramble.len(), scramble.difficulty());
        }
        return Ok(());
    }

    let store = open_store(&config, cli.history_file.as_deref())?;

    if cli.stats || cli.export_csv.is_some() {
        let history = store.load()?;
        if let Some(path) = &cli.export_csv {
            export_csv(path, &history)?;
            println!("exported {} solves to {}", history.len(), path.display());
        }
        if cli.stats {
            print_stats(&history, &config);
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, store);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(IDLE_TICK_MS),
    );
    let result = run_app(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step(app.session.ticker()) {
            TimerEvent::Tick => {
                app.session.tick();
            }
            TimerEvent::Resize => {}
            TimerEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Char(' ') | KeyCode::Enter => app.toggle(),
                    KeyCode::Char('r') => app.session.reset(),
                    KeyCode::Char('n') => app.new_scramble(),
                    _ => {}
                }
            }
        }

        if app.drain_signals() {
            // terminal bell
            io::stdout().write_all(b"\x07")?;
            io::stdout().flush()?;
        }
    }

    Ok(())
}

fn open_store(
    config: &Config,
    path: Option<&Path>,
) -> Result<Box<dyn SolveStore>, Box<dyn Error>> {
    let store: Box<dyn SolveStore> = match config.store {
        StoreBackend::Json => {
            let path = path
                .map(Path::to_path_buf)
                .or_else(AppDirs::history_path)
                .unwrap_or_else(|| PathBuf::from("cubik_history.json"));
            let store = JsonSolveStore::with_path(path);
            info!(path = %store.path().display(), "json history");
            Box::new(store)
        }
        StoreBackend::Sqlite => {
            let path = path
                .map(Path::to_path_buf)
                .or_else(AppDirs::db_path)
                .unwrap_or_else(|| PathBuf::from("cubik_solves.db"));
            Box::new(SqliteSolveStore::open(path)?)
        }
    };
    info!(backend = %config.store, "history store opened");
    Ok(store)
}

fn print_stats(history: &[cubik::session::Solve], config: &Config) {
    let window = &history[history.len().saturating_sub(config.live_window)..];
    let stats = SessionStats::compute(window);
    let or_blank = |value: Option<String>| value.unwrap_or_else(|| "--:--.---".to_string());

    println!("history  {}", history.len());
    println!("solves   {}", stats.solve_count);
    println!("best     {}", or_blank(stats.best_ms.map(format_time)));
    println!("ao5      {}", or_blank(stats.ao5.map(format_average)));
    println!("ao12     {}", or_blank(stats.ao12.map(format_average)));
    println!("mean     {}", or_blank(stats.session_mean.map(format_average)));
    for recent in &stats.recent {
        println!(
            "  solve {:<4} {}  {}",
            recent.position,
            format_time(recent.solve.duration_ms),
            recent.solve.scramble
        );
    }
}

/// Logs go to a file so they never tear the alternate screen
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!("logging disabled: {err}");
            return;
        }
    }
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("logging disabled: {err}");
            return;
        }
    };

    let init = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cubik=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
    if let Err(err) = init {
        warn!(%err, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubik::notify::Notifier;
    use cubik::store::MemorySolveStore;
    use ratatui::backend::TestBackend;

    fn app(beep: bool) -> App {
        let config = Config {
            beep,
            ..Config::default()
        };
        App::new(&config, Box::new(MemorySolveStore::new()))
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui::draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn completing_a_solve_deals_a_new_scramble() {
        let mut app = app(true);
        let shown = app.session.scramble().to_string();

        app.toggle();
        app.toggle();
        assert_eq!(app.session.state(), TimerState::Solving);
        app.toggle();

        assert_eq!(app.session.state(), TimerState::Complete);
        assert_eq!(app.session.history()[0].scramble, shown);
        assert_ne!(app.session.scramble().to_string(), shown);
    }

    #[test]
    fn new_scramble_is_ignored_mid_cycle() {
        let mut app = app(true);
        app.toggle();
        let shown = app.session.scramble().to_string();
        app.new_scramble();
        assert_eq!(app.session.scramble().to_string(), shown);

        app.toggle();
        app.new_scramble();
        assert_eq!(app.session.scramble().to_string(), shown);

        app.session.reset();
        app.new_scramble();
        assert_ne!(app.session.scramble().to_string(), shown);
    }

    #[test]
    fn beeps_only_when_enabled_and_warned() {
        let mut quiet = app(false);
        quiet.session.notifier_mut().signal(Signal::InspectionWarning);
        assert!(!quiet.drain_signals());

        let mut loud = app(true);
        assert!(!loud.drain_signals());
        loud.session.notifier_mut().signal(Signal::InspectionWarning);
        assert!(loud.drain_signals());
        assert!(!loud.drain_signals());
    }

    #[test]
    fn storage_warning_becomes_status_line() {
        let mut app = app(true);
        app.session
            .notifier_mut()
            .signal(Signal::StorageWarning("could not save history: disk full".into()));
        assert!(!app.drain_signals());
        assert_eq!(
            app.status.as_deref(),
            Some("could not save history: disk full")
        );
        assert!(screen(&app).contains("disk full"));
    }

    #[test]
    fn draws_ready_screen() {
        let app = app(true);
        let text = screen(&app);
        assert!(text.contains("Scramble"));
        assert!(text.contains("00:00.000"));
        assert!(text.contains("Ready to start"));
        assert!(text.contains("No solves yet"));
    }

    #[test]
    fn draws_inspection_countdown() {
        let mut app = app(true);
        app.toggle();
        let text = screen(&app);
        assert!(text.contains("Inspecting..."));
        assert!(text.contains("15"));
    }

    #[test]
    fn cli_flags_override_stored_config() {
        let cli = Cli::parse_from(["cubik", "-i", "8", "--no-beep", "--store", "sqlite"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.inspection_secs, 8);
        assert!(!config.beep);
        assert_eq!(config.store, StoreBackend::Sqlite);
    }
}
