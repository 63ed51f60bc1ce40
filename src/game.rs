use std::collections::HashSet;
use std::thread::sleep;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use tracing::{debug, info, trace, warn};

use crate::bonus::{BonusFood, BONUS_REWARD};
use crate::config::{GameConfig, Grid};
use crate::error::GameError;
use crate::food::{free_cell, Food, FoodKind, FoodSpawner};
use crate::obstacles::Obstacles;
use crate::snake::{Direction, MoveResult, Snake};
use crate::Coords;

/// A bonus episode can start whenever the score is a positive multiple of this.
pub const BONUS_SCORE_STEP: u32 = 10;

/// What the player asked for since the last tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intents {
    pub quit: bool,
    pub direction: Option<Direction>,
    pub toggle_pause: bool,
}

pub trait Controller {
    fn poll_intents(&mut self) -> Intents;
}

/// Read-only view of one simulated frame.
pub struct Frame<'a> {
    pub snake: &'a Snake,
    pub food: Food,
    pub bonus: Option<Coords>,
    pub obstacles: &'a [Coords],
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>);
    fn render_game_over(&mut self);
    fn render_paused(&mut self);
    fn update_title(&mut self, score: u32, fps: u32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Running,
    Died,
    /// No free cell left for the next food.
    BoardFilled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    Died,
    BoardFilled,
}

/// Temporary speed multiplier from a speed food.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SpeedEffect {
    ticks_left: u32,
    factor: f32,
    base_speed: f32,
}

pub struct Game {
    config: GameConfig,
    rng: StdRng,
    snake: Snake,
    food: Food,
    spawner: FoodSpawner,
    obstacles: Obstacles,
    bonus: BonusFood,
    speed_effect: Option<SpeedEffect>,
    score: u32,
    paused: bool,
}

impl Game {
    pub fn new(config: GameConfig, mut rng: StdRng) -> Result<Self, GameError> {
        config.validate()?;

        let grid = config.grid;
        let snake = Snake::new(grid, config.initial_speed);
        let mut spawner = FoodSpawner::new();
        let occupied: HashSet<Coords> = snake.cells().collect();
        let food = spawner.spawn(&mut rng, grid, &occupied)?;
        let obstacles = Obstacles::place(&mut rng, grid, config.obstacles, snake.head_cell(), food.position)?;
        let bonus = BonusFood::new(config.bonus_timeout);

        Ok(Game {
            config,
            rng,
            snake,
            food,
            spawner,
            obstacles,
            bonus,
            speed_effect: None,
            score: 0,
            paused: false,
        })
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        debug!(paused = self.paused, "pause toggled");
    }

    pub fn steer(&mut self, direction: Direction) -> bool {
        self.snake.set_direction(direction)
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            snake: &self.snake,
            food: self.food,
            bonus: self.bonus.position(),
            obstacles: self.obstacles.cells(),
        }
    }

    pub fn run<C: Controller, R: Renderer>(&mut self, controller: &mut C, renderer: &mut R) -> SessionEnd {
        let target = self.config.frame_duration();
        let mut title_timestamp = Instant::now();
        let mut frame_count = 0;

        info!(grid = ?self.config.grid, obstacles = self.obstacles.cells().len(), "game started");

        loop {
            let frame_start = Instant::now();

            let intents = controller.poll_intents();
            if intents.quit {
                info!(score = self.score, "game quit");
                return SessionEnd::Quit;
            }
            if intents.toggle_pause {
                self.toggle_pause();
            }

            if self.paused {
                renderer.render_paused();
            } else {
                if let Some(dir) = intents.direction {
                    self.steer(dir);
                }

                match self.update() {
                    Tick::Running => renderer.render(&self.frame()),
                    Tick::Died => {
                        renderer.render(&self.frame());
                        renderer.render_game_over();
                        info!(score = self.score, size = self.snake.size(), "snake died");
                        sleep(self.config.game_over_pause);
                        return SessionEnd::Died;
                    }
                    Tick::BoardFilled => {
                        renderer.render(&self.frame());
                        info!(score = self.score, "board filled");
                        return SessionEnd::BoardFilled;
                    }
                }
            }

            frame_count += 1;
            if title_timestamp.elapsed() >= Duration::from_secs(1) {
                renderer.update_title(self.score, frame_count);
                frame_count = 0;
                title_timestamp = Instant::now();
            }

            // No catch-up: a slow frame just runs long
            let frame_duration = frame_start.elapsed();
            if frame_duration < target {
                sleep(target - frame_duration);
            }
        }
    }

    /// Advances the simulation by one tick.
    pub fn update(&mut self) -> Tick {
        let head = match self.snake.update() {
            MoveResult::Crashed => return Tick::Died,
            MoveResult::Stayed => self.snake.head_cell(),
            MoveResult::Moved { new_head, old_head } => {
                trace!(?old_head, ?new_head, "snake crossed a cell");
                new_head
            }
        };

        if self.obstacles.contains(head) {
            self.snake.kill();
            return Tick::Died;
        }

        if head == self.food.position {
            let kind = self.food.kind;
            self.eat(kind);
            if let Err(err) = self.replace_food() {
                info!(%err, "no room for more food");
                return Tick::BoardFilled;
            }
        }

        if self.bonus.try_consume(head) {
            self.score += BONUS_REWARD;
            info!(score = self.score, "bonus food eaten");
        }

        self.maybe_start_bonus();
        self.tick_speed_effect();

        Tick::Running
    }

    fn eat(&mut self, kind: FoodKind) {
        let effect = kind.effect();
        self.score += effect.score;
        for _ in 0..effect.growth {
            self.snake.grow();
        }
        if let Some((factor, ticks)) = effect.speed {
            self.apply_speed_effect(factor, ticks);
        }
        debug!(?kind, score = self.score, speed_factor = self.speed_factor(), "food eaten");
    }

    fn replace_food(&mut self) -> Result<(), GameError> {
        let occupied = self.occupied_cells();
        self.food = self.spawner.spawn(&mut self.rng, self.config.grid, &occupied)?;
        debug!(placed = self.spawner.placed(), food = ?self.food, "food placed");
        Ok(())
    }

    fn occupied_cells(&self) -> HashSet<Coords> {
        let mut occupied: HashSet<Coords> = self.snake.cells().collect();
        self.obstacles.extend_set(&mut occupied);
        occupied
    }

    fn maybe_start_bonus(&mut self) {
        if self.score == 0 || self.score % BONUS_SCORE_STEP != 0 || self.bonus.is_active() {
            return;
        }

        let mut occupied = self.occupied_cells();
        occupied.insert(self.food.position);
        let grid: Grid = self.config.grid;
        let rng = &mut self.rng;

        // The returned handle is dropped: the timer runs detached.
        match self.bonus.start_episode(|| free_cell(rng, grid, &occupied)) {
            Ok(_) => {}
            Err(GameError::BoardFull { .. }) => debug!("no room for bonus food"),
            Err(err) => warn!(%err, "bonus food skipped"),
        }
    }

    /// A new pickup replaces any running effect instead of stacking on it.
    fn apply_speed_effect(&mut self, factor: f32, ticks: u32) {
        let base_speed = match self.speed_effect.take() {
            Some(effect) => effect.base_speed,
            None => self.snake.speed(),
        };

        self.snake.set_speed(base_speed * factor);
        self.speed_effect = Some(SpeedEffect { ticks_left: ticks, factor, base_speed });
        debug!(factor, ticks, "speed effect applied");
    }

    fn tick_speed_effect(&mut self) {
        let Some(effect) = self.speed_effect.as_mut() else {
            return;
        };

        effect.ticks_left = effect.ticks_left.saturating_sub(1);
        if effect.ticks_left == 0 {
            let base_speed = effect.base_speed;
            self.snake.set_speed(base_speed);
            self.speed_effect = None;
            debug!(speed = base_speed, "speed effect expired");
        }
    }

    /// Multiplier currently applied to the base speed.
    pub fn speed_factor(&self) -> f32 {
        self.speed_effect.map_or(1.0, |effect| effect.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::EpisodeEnd;
    use crate::food::SPEED_EFFECT_TICKS;
    use crate::snake::Direction::*;
    use rand::SeedableRng;
    use std::collections::VecDeque;

    fn test_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.bonus_timeout = Duration::from_secs(30);
        config.game_over_pause = Duration::ZERO;
        config.fps = 1000;
        config
    }

    fn new_game() -> Game {
        Game::new(test_config(), StdRng::seed_from_u64(42)).unwrap()
    }

    /// A game with no obstacles and the food parked far from the snake.
    fn open_game() -> Game {
        let mut game = new_game();
        game.obstacles = Obstacles::from_cells(vec![]);
        game.food = Food { position: (0, 0), kind: FoodKind::Normal };
        game
    }

    struct Scripted(VecDeque<Intents>);

    impl Controller for Scripted {
        fn poll_intents(&mut self) -> Intents {
            self.0.pop_front().unwrap_or(Intents { quit: true, ..Intents::default() })
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: usize,
        game_over: usize,
        paused: usize,
        last_head: Option<Coords>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, frame: &Frame<'_>) {
            self.frames += 1;
            self.last_head = Some(frame.snake.head_cell());
        }

        fn render_game_over(&mut self) {
            self.game_over += 1;
        }

        fn render_paused(&mut self) {
            self.paused += 1;
        }

        fn update_title(&mut self, _score: u32, _fps: u32) {}
    }

    #[test]
    fn new_game_layout_is_consistent() {
        let game = new_game();
        assert_eq!(game.snake.head_cell(), (16, 16));
        assert_eq!(game.obstacles.cells().len(), 15);
        assert!(!game.obstacles.contains((16, 16)));
        assert!(!game.obstacles.contains(game.food.position));
        assert_ne!(game.food.position, (16, 16));
        assert_eq!(game.score(), 0);
        assert!(!game.bonus.is_active());
    }

    #[test]
    fn reversal_guard_follows_snake_size() {
        let mut game = open_game();
        assert_eq!(game.snake.direction(), Up);
        assert!(game.steer(Down));
        assert_eq!(game.snake.direction(), Down);

        game.snake.grow();
        for _ in 0..100 {
            if game.snake.size() == 2 {
                break;
            }
            game.update();
        }
        assert_eq!(game.snake.size(), 2);

        assert!(!game.steer(Up));
        assert_eq!(game.snake.direction(), Down);
    }

    #[test]
    fn hitting_an_obstacle_is_fatal() {
        let mut game = open_game();
        game.obstacles = Obstacles::from_cells(vec![(16, 15)]);
        assert_eq!(game.update(), Tick::Died);
        assert!(!game.snake.is_alive());
    }

    #[test]
    fn eating_normal_food_scores_grows_and_replaces() {
        let mut game = open_game();
        game.food = Food { position: (16, 15), kind: FoodKind::Normal };

        assert_eq!(game.update(), Tick::Running);
        assert_eq!(game.score(), 1);
        assert_ne!(game.food.position, (16, 15));
        assert_eq!(game.spawner.placed(), 2);

        while game.snake.head_cell() == (16, 15) {
            game.update();
        }
        assert_eq!(game.snake.size(), 2);
    }

    #[test]
    fn special_food_is_worth_five() {
        let mut game = open_game();
        game.food = Food { position: (16, 15), kind: FoodKind::SpecialScore };
        game.update();
        assert_eq!(game.score(), 5);
        assert!(game.snake.is_growing());
    }

    #[test]
    fn speed_food_changes_speed_without_growth() {
        let mut game = open_game();
        let base = game.snake.speed();
        game.food = Food { position: (16, 15), kind: FoodKind::SpeedUp };
        game.update();

        assert_eq!(game.score(), 1);
        assert!(!game.snake.is_growing());
        assert_eq!(game.snake.speed(), base * 1.5);
        assert_eq!(game.speed_factor(), 1.5);
    }

    #[test]
    fn speed_effect_reverts_after_its_duration() {
        let mut game = open_game();
        let base = game.snake.speed();

        game.apply_speed_effect(0.5, SPEED_EFFECT_TICKS);
        assert_eq!(game.snake.speed(), base * 0.5);

        for _ in 0..SPEED_EFFECT_TICKS - 1 {
            game.tick_speed_effect();
        }
        assert_eq!(game.speed_factor(), 0.5);

        game.tick_speed_effect();
        assert_eq!(game.snake.speed(), base);
        assert_eq!(game.speed_factor(), 1.0);
    }

    #[test]
    fn slow_food_wears_off_on_the_1800th_update() {
        let mut game = open_game();
        let base = game.snake.speed();
        game.food = Food { position: (16, 15), kind: FoodKind::SlowDown };

        // The pickup tick is the first of the effect's ticks
        assert_eq!(game.update(), Tick::Running);
        assert_eq!(game.snake.speed(), base * 0.5);
        game.food = Food { position: (0, 0), kind: FoodKind::Normal };

        for _ in 1..SPEED_EFFECT_TICKS - 1 {
            assert_eq!(game.update(), Tick::Running);
        }
        assert_eq!(game.speed_factor(), 0.5);
        assert_eq!(game.snake.speed(), base * 0.5);

        assert_eq!(game.update(), Tick::Running);
        assert_eq!(game.snake.speed(), base);
        assert_eq!(game.speed_factor(), 1.0);
        assert_eq!(game.score(), 1);
    }

    #[test]
    fn new_speed_pickup_replaces_the_old_one() {
        let mut game = open_game();
        let base = game.snake.speed();

        game.apply_speed_effect(1.5, SPEED_EFFECT_TICKS);
        for _ in 0..100 {
            game.tick_speed_effect();
        }
        game.apply_speed_effect(1.5, SPEED_EFFECT_TICKS);
        assert_eq!(game.snake.speed(), base * 1.5);

        for _ in 0..SPEED_EFFECT_TICKS {
            game.tick_speed_effect();
        }
        assert_eq!(game.snake.speed(), base);
    }

    #[test]
    fn score_of_ten_starts_a_bonus_in_the_same_tick() {
        let mut game = open_game();
        game.score = 9;
        game.food = Food { position: (16, 15), kind: FoodKind::Normal };

        game.update();
        assert_eq!(game.score(), 10);
        let bonus = game.bonus.position().expect("bonus should be active");
        assert!(!game.obstacles.contains(bonus));
        assert_ne!(bonus, game.food.position);
        assert!(!game.snake.occupies(bonus));
    }

    #[test]
    fn no_second_bonus_while_one_is_active() {
        let mut game = open_game();
        game.bonus.start_episode(|| Ok((2, 2))).unwrap();
        let first = game.bonus.position().unwrap();

        game.score = 14;
        game.food = Food { position: (16, 15), kind: FoodKind::Normal };
        game.update();
        assert_eq!(game.score(), 15);
        assert_eq!(game.bonus.position(), Some(first));

        game.score = 20;
        game.maybe_start_bonus();
        assert_eq!(game.bonus.position(), Some(first));
    }

    #[test]
    fn eating_the_bonus_adds_ten() {
        let mut game = open_game();
        let timer = game.bonus.start_episode(|| Ok((16, 15))).unwrap().unwrap();

        game.update();
        assert_eq!(game.score(), BONUS_REWARD);
        assert_eq!(timer.join().unwrap(), EpisodeEnd::Consumed);
    }

    #[test]
    fn run_stops_on_quit() {
        let mut game = open_game();
        let mut controller = Scripted(VecDeque::from(vec![Intents::default(); 3]));
        let mut renderer = Recorder::default();

        assert_eq!(game.run(&mut controller, &mut renderer), SessionEnd::Quit);
        assert_eq!(renderer.frames, 3);
        assert_eq!(renderer.game_over, 0);
    }

    #[test]
    fn run_while_paused_only_draws_the_overlay() {
        let mut game = open_game();
        let pause = Intents { toggle_pause: true, ..Intents::default() };
        let turn = Intents { direction: Some(Left), ..Intents::default() };
        let mut controller = Scripted(VecDeque::from(vec![pause, turn, Intents::default()]));
        let mut renderer = Recorder::default();

        game.run(&mut controller, &mut renderer);
        assert_eq!(renderer.paused, 3);
        assert_eq!(renderer.frames, 0);
        assert_eq!(game.snake.head_cell(), (16, 16));
        assert_eq!(game.snake.direction(), Up);
        assert!(game.paused);
    }

    #[test]
    fn run_ends_with_game_over_on_death() {
        let mut game = open_game();
        game.obstacles = Obstacles::from_cells(vec![(16, 15)]);
        let mut controller = Scripted(VecDeque::from(vec![Intents::default(); 5]));
        let mut renderer = Recorder::default();

        assert_eq!(game.run(&mut controller, &mut renderer), SessionEnd::Died);
        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.game_over, 1);
        assert_eq!(renderer.last_head, Some((16, 15)));
    }

    #[test]
    fn direction_intent_turns_the_snake() {
        let mut game = open_game();
        let turn = Intents { direction: Some(Right), ..Intents::default() };
        let mut controller = Scripted(VecDeque::from(vec![turn]));
        let mut renderer = Recorder::default();

        game.run(&mut controller, &mut renderer);
        assert_eq!(game.snake.direction(), Right);
    }
}
