use std::collections::VecDeque;

use crate::config::Grid;
use crate::Coords;
use Direction::*;
use MoveResult::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MoveResult {
    /// Still inside the same cell, body untouched.
    Stayed,
    Moved { new_head: Coords, old_head: Coords },
    Crashed
}

/// A snake moving continuously over a toroidal grid.
///
/// The head position is real-valued so the snake can sit mid-cell at slow
/// speeds; the body only changes shape when the head crosses a cell boundary.
/// `body` stores the previously occupied cells, oldest first.
pub struct Snake {
    grid: Grid,
    head_x: f32,
    head_y: f32,
    direction: Direction,
    speed: f32,
    size: usize,
    alive: bool,
    growing: bool,
    body: VecDeque<Coords>,
}

impl Snake {
    /// A single-segment snake at the center of the grid, facing up.
    pub fn new(grid: Grid, speed: f32) -> Self {
        let (x, y) = grid.center();
        Snake {
            grid,
            head_x: x as f32,
            head_y: y as f32,
            direction: Up,
            speed,
            size: 1,
            alive: true,
            growing: false,
            body: VecDeque::new(),
        }
    }

    pub fn head_cell(&self) -> Coords {
        (self.head_x.floor() as i32, self.head_y.floor() as i32)
    }

    pub fn body(&self) -> &VecDeque<Coords> {
        &self.body
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Marks the snake to grow on its next cell crossing. Calling it again
    /// before that crossing has no extra effect.
    pub fn grow(&mut self) {
        self.growing = true;
    }

    /// Turns the snake unless the request would reverse it onto its own body.
    /// A single-segment snake can reverse freely. Returns whether the
    /// direction was accepted.
    pub fn set_direction(&mut self, new_direction: Direction) -> bool {
        if new_direction == self.direction.opposite() && self.size > 1 {
            return false;
        }

        self.direction = new_direction;
        true
    }

    /// Head first, then the body from newest to oldest.
    pub fn cells(&self) -> impl Iterator<Item = Coords> + '_ {
        std::iter::once(self.head_cell()).chain(self.body.iter().rev().copied())
    }

    pub fn update(&mut self) -> MoveResult {
        if !self.alive {
            return Crashed;
        }

        let old_head = self.head_cell();
        self.move_head();
        let new_head = self.head_cell();

        if new_head == old_head {
            return Stayed;
        }

        self.body.push_back(old_head);
        if self.growing {
            self.growing = false;
            self.size += 1;
        } else {
            self.body.pop_front();
        }

        if self.body.contains(&new_head) {
            self.alive = false;
            return Crashed;
        }

        Moved { new_head, old_head }
    }

    fn move_head(&mut self) {
        match self.direction {
            Up => self.head_y -= self.speed,
            Down => self.head_y += self.speed,
            Left => self.head_x -= self.speed,
            Right => self.head_x += self.speed,
        }

        self.head_x = wrap(self.head_x, self.grid.width as f32);
        self.head_y = wrap(self.head_y, self.grid.height as f32);
    }
}

// rem_euclid of a tiny negative value can round up to `len` itself.
fn wrap(value: f32, len: f32) -> f32 {
    let wrapped = value.rem_euclid(len);
    if wrapped >= len {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
impl Snake {
    pub(crate) fn occupies(&self, cell: Coords) -> bool {
        self.head_cell() == cell || self.body.contains(&cell)
    }

    pub(crate) fn is_growing(&self) -> bool {
        self.growing
    }

    pub(crate) fn place_head(&mut self, x: f32, y: f32) {
        self.head_x = x;
        self.head_y = y;
    }

    pub(crate) fn with_body(grid: Grid, head: (f32, f32), direction: Direction, body: &[Coords]) -> Self {
        let mut snake = Snake::new(grid, 0.1);
        snake.place_head(head.0, head.1);
        snake.direction = direction;
        snake.body = body.iter().copied().collect();
        snake.size = body.len() + 1;
        snake
    }
}
