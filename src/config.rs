use std::time::Duration;

use clap::ValueEnum;

use crate::error::GameError;
use crate::Coords;

pub const DEFAULT_GRID_SIZE: u16 = 32;
pub const DEFAULT_FPS: u32 = 60;
pub const DEFAULT_BONUS_SECS: u64 = 15;
pub const GAME_OVER_PAUSE_MS: u64 = 2000;

/// Playing field dimensions, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        Grid { width, height }
    }

    pub fn center(&self) -> Coords {
        (self.width / 2, self.height / 2)
    }

    pub fn area(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    pub fn contains(&self, (x, y): Coords) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Coords> {
        let (w, h) = (self.width, self.height);
        (0..h).flat_map(move |y| (0..w).map(move |x| (x, y)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn obstacle_count(self) -> usize {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 15,
            Difficulty::Hard => 30,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SpeedPreset {
    Slow,
    Medium,
    Fast,
}

impl SpeedPreset {
    /// Cells per tick.
    pub fn cells_per_tick(self) -> f32 {
        match self {
            SpeedPreset::Slow => 0.07,
            SpeedPreset::Medium => 0.10,
            SpeedPreset::Fast => 0.16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub grid: Grid,
    pub initial_speed: f32,
    pub obstacles: usize,
    pub fps: u32,
    pub bonus_timeout: Duration,
    pub game_over_pause: Duration,
}

impl GameConfig {
    pub fn new(grid: Grid, speed: SpeedPreset, difficulty: Difficulty) -> Self {
        GameConfig {
            grid,
            initial_speed: speed.cells_per_tick(),
            obstacles: difficulty.obstacle_count(),
            fps: DEFAULT_FPS,
            bonus_timeout: Duration::from_secs(DEFAULT_BONUS_SECS),
            game_over_pause: Duration::from_millis(GAME_OVER_PAUSE_MS),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }

    /// The grid must fit the snake, the food, the bonus food and every
    /// obstacle with room to spare.
    pub fn validate(&self) -> Result<(), GameError> {
        let Grid { width, height } = self.grid;
        if width < 2 || height < 2 {
            return Err(GameError::InvalidGrid { width, height });
        }

        let needed = self.obstacles + 3;
        if needed >= self.grid.area() {
            return Err(GameError::BoardFull { needed, free: self.grid.area() });
        }

        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let size = DEFAULT_GRID_SIZE as i32;
        GameConfig::new(Grid::new(size, size), SpeedPreset::Medium, Difficulty::Medium)
    }
}
