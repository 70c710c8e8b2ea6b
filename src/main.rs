mod app;
mod save;
mod ui;

use anyhow::{bail, Context, Result};
use app::{App, InputMode};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fmseq::SequencerConfig;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::{fs::File, io, path::PathBuf, sync::Mutex, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "fmseq.log";

struct Args {
    config:  Option<PathBuf>,
    library: PathBuf,
    export:  PathBuf,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config:  std::env::var_os("FMSEQ_CONFIG").map(PathBuf::from),
        library: PathBuf::from("fmseq_sequences.json"),
        export:  PathBuf::from("fmseq_playback.json"),
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "--config"  => args.config = Some(PathBuf::from(value()?)),
            "--library" => args.library = PathBuf::from(value()?),
            "--export"  => args.export = PathBuf::from(value()?),
            "-h" | "--help" => {
                println!("usage: fmseq [--config FILE] [--library FILE] [--export FILE]");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(args)
}

/// Log to a file; stdout belongs to the terminal UI.
fn init_logging() -> Result<()> {
    let file = File::create(LOG_FILE).with_context(|| format!("creating {}", LOG_FILE))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging()?;
    let config = match &args.config {
        Some(path) => SequencerConfig::load(path)?,
        None => SequencerConfig::default(),
    };
    info!(?config, "starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut app = App::new(&config, args.library, args.export);
    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    if let Err(e) = result { eprintln!("Error: {:?}", e); }
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        if app.take_dirty() {
            terminal.draw(|f| ui::draw(f, app))?;
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let size = terminal.size()?;
        let frame = Rect::new(0, 0, size.width, size.height);

        match event::read()? {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Release { continue; }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

                // ── Prompt: intercept all keys ────────────────────────────
                if app.input_mode != InputMode::None {
                    match key.code {
                        KeyCode::Esc       => app.cancel_input(),
                        KeyCode::Enter     => app.commit_input(),
                        KeyCode::Backspace => { app.input_buf.pop(); app.mark_dirty(); }
                        KeyCode::Char(c) if !ctrl => { app.input_buf.push(c); app.mark_dirty(); }
                        _ => {}
                    }
                    continue;
                }

                let steps = ui::visible_steps(frame);
                match key.code {
                    KeyCode::Esc => app.should_quit = true,
                    KeyCode::Char('c') if ctrl => app.should_quit = true,
                    KeyCode::Char('s') if ctrl => app.begin_input(InputMode::SaveName),
                    KeyCode::Char('l') if ctrl => app.begin_input(InputMode::LoadIndex),
                    KeyCode::Char('e') if ctrl => app.export_playback(),

                    KeyCode::Left      => app.cursor_left(steps),
                    KeyCode::Right     => app.cursor_right(steps),
                    KeyCode::Up        => app.cursor_up(),
                    KeyCode::Down      => app.cursor_down(),
                    KeyCode::Char(' ') | KeyCode::Enter => app.toggle_cursor(),

                    KeyCode::Char('[') => app.octave_down(),
                    KeyCode::Char(']') => app.octave_up(),
                    KeyCode::Char('-') => app.transpose(-1),
                    KeyCode::Char('=') => app.transpose(1),
                    KeyCode::Char('_') => app.transpose(-12),
                    KeyCode::Char('+') => app.transpose(12),
                    KeyCode::Char('c') => app.clear_grid(),

                    KeyCode::PageUp    => app.bpm_up(),
                    KeyCode::PageDown  => app.bpm_down(),
                    KeyCode::Char('b') => app.begin_input(InputMode::Bpm),
                    KeyCode::Char('n') => app.cycle_note_length(true),
                    KeyCode::Char('N') => app.cycle_note_length(false),
                    _ => {}
                }
            }
            Event::Mouse(m) => {
                let shift = m.modifiers.contains(KeyModifiers::SHIFT);
                match m.kind {
                    MouseEventKind::ScrollDown  => app.wheel(1.0, shift),
                    MouseEventKind::ScrollUp    => app.wheel(-1.0, shift),
                    MouseEventKind::ScrollRight => app.wheel(1.0, true),
                    MouseEventKind::ScrollLeft  => app.wheel(-1.0, true),
                    MouseEventKind::Down(MouseButton::Left) => app.click(frame, m.column, m.row),
                    _ => {}
                }
            }
            Event::Resize(_, _) => app.mark_dirty(),
            _ => {}
        }
        if app.should_quit { break; }
    }

    info!("quit");
    Ok(())
}
