mod bonus;
mod config;
mod error;
mod food;
mod game;
mod obstacles;
mod scores;
mod snake;
mod term;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::{Difficulty, GameConfig, Grid, SpeedPreset, DEFAULT_BONUS_SECS, DEFAULT_FPS, DEFAULT_GRID_SIZE};
use crate::game::{Game, SessionEnd};
use crate::scores::{PendingSave, ScoreManager};
use crate::term::{TermController, TermRenderer};

/// Grid cell, column then row. Cells off the grid are used as "nowhere".
pub type Coords = (i32, i32);

const SHOWN_SCORES: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "torus-snake")]
#[command(about = "Terminal snake on a wrap-around grid, with obstacles, power-ups and timed bonus food")]
struct Cli {
    /// Name stored next to your score
    #[arg(long, default_value = "player")]
    name: String,
    #[arg(long, value_enum, default_value_t = SpeedPreset::Medium)]
    speed: SpeedPreset,
    #[arg(long, value_enum, default_value_t = Difficulty::Medium)]
    difficulty: Difficulty,
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE, value_parser = clap::value_parser!(u16).range(8..=64))]
    width: u16,
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE, value_parser = clap::value_parser!(u16).range(8..=64))]
    height: u16,
    /// Simulation ticks per second
    #[arg(long, default_value_t = DEFAULT_FPS, value_parser = clap::value_parser!(u32).range(1..=240))]
    fps: u32,
    /// Seconds before an uneaten bonus food disappears
    #[arg(long, default_value_t = DEFAULT_BONUS_SECS)]
    bonus_secs: u64,
    #[arg(long, default_value = "highscores.txt")]
    scores: PathBuf,
    /// Fixed RNG seed, for reproducible layouts
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "snake.log")]
    log_file: PathBuf,
}

impl Cli {
    fn game_config(&self) -> GameConfig {
        let grid = Grid::new(self.width as i32, self.height as i32);
        let mut config = GameConfig::new(grid, self.speed, self.difficulty);
        config.fps = self.fps;
        config.bonus_timeout = Duration::from_secs(self.bonus_secs);
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file);

    let config = cli.game_config();
    config.validate().context("invalid game settings")?;

    let needed = TermRenderer::required_size(config.grid);
    let (cols, rows) = crossterm::terminal::size().context("could not read terminal size")?;
    if cols < needed.0 || rows < needed.1 {
        bail!("terminal is {}x{}, the board needs at least {}x{}", cols, rows, needed.0, needed.1);
    }

    let mut scores = ScoreManager::load(&cli.scores);
    info!(path = %scores.path().display(), entries = scores.high_scores(usize::MAX).len(), "scores loaded");
    let mut renderer = TermRenderer::new(config.grid);
    let mut controller = TermController;

    renderer.setup().context("could not set up the terminal")?;
    let res = play_sessions(&cli, &config, &mut scores, &mut renderer, &mut controller);
    renderer.restore().context("could not restore the terminal")?;
    res
}

fn play_sessions(
    cli: &Cli,
    config: &GameConfig,
    scores: &mut ScoreManager,
    renderer: &mut TermRenderer,
    controller: &mut TermController,
) -> Result<()> {
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut pending_save: Option<PendingSave> = None;

    loop {
        renderer.clear()?;
        let session_rng = StdRng::from_rng(&mut rng).context("could not seed the game")?;
        let mut game = Game::new(config.clone(), session_rng)?;
        let end = game.run(controller, renderer);

        let score = game.score();
        info!(player = %cli.name, score, size = game.snake().size(), ?end, "session over");

        // One write at a time
        if let Some(save) = pending_save.take() {
            save.wait();
        }
        scores.add_score(&cli.name, score);
        pending_save = Some(scores.save_async());

        if end == SessionEnd::Quit {
            break;
        }

        let headline = match end {
            SessionEnd::BoardFilled => "You filled the board!".to_string(),
            _ => "Game over!".to_string(),
        };
        let mut lines = vec![headline, format!("Score: {}", score), String::new(), "Top scores".to_string()];
        for entry in scores.high_scores(SHOWN_SCORES) {
            lines.push(format!("{:<16} {:>5}", entry.name, entry.score));
        }
        lines.push(String::new());
        lines.push("r: play again   q: quit".to_string());

        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        renderer.show_message(&lines)?;

        if !controller.wait_restart_or_quit() {
            break;
        }
    }

    // Early returns above drop `pending_save`, which also waits for it
    if let Some(save) = pending_save {
        save.wait();
    }
    Ok(())
}

// The terminal belongs to the game, so logs go to a file.
fn init_logging(path: &Path) {
    let file = match File::create(path) {
        Ok(file) => file,
        Err(_) => return,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
