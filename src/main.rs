mod app;
mod audio;
mod clips;
mod controller;
mod mixer;
mod pattern;
mod ui;

use anyhow::{Context, Result};
use app::App;
use audio::AudioEngine;
use clap::Parser;
use clips::ClipBank;
use controller::{BeatController, DEFAULT_INTERVAL};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mixer::Mixer;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "bpmbeat")]
#[command(about = "Fixed-tempo drum beat with a random melody, one Start/Stop button", long_about = None)]
struct Cli {
    /// Milliseconds between beats
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_millis() as u64,
          value_parser = clap::value_parser!(u64).range(20..=5000))]
    interval_ms: u64,

    /// Directory of WAV clips (kick_a, snare_g, hihat5, c1, d, e, f, g, a, h, c)
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Initial master volume 0.0-1.0
    #[arg(long, default_value = "0.5")]
    volume: f32,

    /// Seed for note and duration selection
    #[arg(long)]
    seed: Option<u64>,

    /// Write log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(cli: &Cli) -> Result<()> {
    // The terminal belongs to the UI, so only log when asked for a file.
    let Some(path) = &cli.log_file else { return Ok(()) };
    let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();
    Ok(())
}

/// Fill the mixer from `samples` or the built-in kit.  The bank is built
/// without holding the lock the audio callback needs.
fn load_clips(mixer: &Mutex<Mixer>, samples: Option<&Path>, volume: f32) {
    let sample_rate = mixer.lock().unwrap().sample_rate;
    let bank = match samples {
        Some(dir) => ClipBank::from_dir(dir),
        None => ClipBank::synthesized(sample_rate as u32),
    };
    info!(clips = bank.loaded(), "clip bank ready");
    let mut m = mixer.lock().unwrap();
    m.volume = volume.clamp(0.0, 1.0);
    m.load(bank);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let result = run(&mut terminal, &cli);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    if let Err(e) = result { eprintln!("Error: {:?}", e); }
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, cli: &Cli) -> Result<()> {
    let mixer = Arc::new(Mutex::new(Mixer::new(44100.0)));
    let _audio = AudioEngine::new(Arc::clone(&mixer))?;

    load_clips(&mixer, cli.samples.as_deref(), cli.volume);

    let interval = Duration::from_millis(cli.interval_ms);
    let controller = BeatController::new(mixer.clone(), interval, cli.seed);
    let mut app = App::new(controller, Arc::clone(&mixer));

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.should_quit = true,
                    KeyCode::Char(' ') | KeyCode::Enter if key.kind == KeyEventKind::Press => app.toggle_play(),
                    KeyCode::Up   => app.volume_up(),
                    KeyCode::Down => app.volume_down(),
                    _ => {}
                },
                Event::Mouse(m) if m.kind == MouseEventKind::Down(MouseButton::Left) => {
                    let size = terminal.size()?;
                    app.click(m.column, m.row, Rect::new(0, 0, size.width, size.height));
                }
                _ => {}
            }
        }
        if app.should_quit { break; }
    }

    // Dropping the app stops the timer and releases every clip.
    drop(app);
    Ok(())
}
