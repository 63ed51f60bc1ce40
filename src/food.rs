use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Grid;
use crate::error::GameError;
use crate::Coords;

/// Every n-th placed food is a special one.
pub const SPECIAL_FOOD_PERIOD: u32 = 5;
/// 30 seconds at 60 ticks per second.
pub const SPEED_EFFECT_TICKS: u32 = 30 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoodKind {
    Normal,
    SpecialScore,
    SpeedUp,
    SlowDown,
}

/// What eating a piece of food does to the game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoodEffect {
    pub score: u32,
    pub growth: u32,
    /// Speed multiplier and how many ticks it lasts.
    pub speed: Option<(f32, u32)>,
}

const NORMAL: FoodEffect = FoodEffect { score: 1, growth: 1, speed: None };
const SPECIAL_SCORE: FoodEffect = FoodEffect { score: 5, growth: 2, speed: None };
const SPEED_UP: FoodEffect = FoodEffect { score: 1, growth: 0, speed: Some((1.5, SPEED_EFFECT_TICKS)) };
const SLOW_DOWN: FoodEffect = FoodEffect { score: 1, growth: 0, speed: Some((0.5, SPEED_EFFECT_TICKS)) };

impl FoodKind {
    pub fn effect(self) -> FoodEffect {
        match self {
            FoodKind::Normal => NORMAL,
            FoodKind::SpecialScore => SPECIAL_SCORE,
            FoodKind::SpeedUp => SPEED_UP,
            FoodKind::SlowDown => SLOW_DOWN,
        }
    }

    /// Maps a single 0..10 draw onto a food kind: 0 speeds up, 1 slows down,
    /// anything else is normal.
    pub fn from_draw(draw: u32) -> FoodKind {
        match draw {
            0 => FoodKind::SpeedUp,
            1 => FoodKind::SlowDown,
            _ => FoodKind::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Food {
    pub position: Coords,
    pub kind: FoodKind,
}

/// Places food and decides its kind. Counts placements so that every
/// `SPECIAL_FOOD_PERIOD`-th food is `SpecialScore`.
#[derive(Debug, Default)]
pub struct FoodSpawner {
    placed: u32,
}

impl FoodSpawner {
    pub fn new() -> Self {
        FoodSpawner { placed: 0 }
    }

    pub fn placed(&self) -> u32 {
        self.placed
    }

    pub fn spawn<R: Rng + ?Sized>(&mut self, rng: &mut R, grid: Grid, occupied: &HashSet<Coords>) -> Result<Food, GameError> {
        let position = free_cell(rng, grid, occupied)?;
        self.placed += 1;

        let kind = if self.placed % SPECIAL_FOOD_PERIOD == 0 {
            FoodKind::SpecialScore
        } else {
            FoodKind::from_draw(rng.gen_range(0..10))
        };

        Ok(Food { position, kind })
    }
}

/// Picks a uniformly random cell not in `occupied`.
///
/// The free cells are collected up front, so a full board is reported as
/// `BoardFull` instead of retrying forever.
pub fn free_cell<R: Rng + ?Sized>(rng: &mut R, grid: Grid, occupied: &HashSet<Coords>) -> Result<Coords, GameError> {
    let choices: Vec<Coords> = grid.cells().filter(|pos| !occupied.contains(pos)).collect();
    choices.choose(rng).copied().ok_or(GameError::BoardFull { needed: 1, free: 0 })
}
