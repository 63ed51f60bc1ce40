use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Grid;
use crate::error::GameError;
use crate::Coords;

/// Static cells that kill the snake on contact. Chosen once per game.
#[derive(Debug, Default)]
pub struct Obstacles {
    cells: Vec<Coords>,
}

impl Obstacles {
    /// Picks `count` distinct cells, none of them on the snake's start cell
    /// or the food.
    pub fn place<R: Rng + ?Sized>(
        rng: &mut R,
        grid: Grid,
        count: usize,
        snake_start: Coords,
        food: Coords,
    ) -> Result<Self, GameError> {
        let choices: Vec<Coords> = grid.cells().filter(|&pos| pos != snake_start && pos != food).collect();
        if choices.len() < count {
            return Err(GameError::BoardFull { needed: count, free: choices.len() });
        }

        let cells = choices.choose_multiple(rng, count).copied().collect();
        Ok(Obstacles { cells })
    }

    pub fn cells(&self) -> &[Coords] {
        &self.cells
    }

    pub fn contains(&self, cell: Coords) -> bool {
        self.cells.contains(&cell)
    }

    pub fn extend_set(&self, set: &mut HashSet<Coords>) {
        set.extend(self.cells.iter().copied());
    }

    #[cfg(test)]
    pub(crate) fn from_cells(cells: Vec<Coords>) -> Self {
        Obstacles { cells }
    }
}
