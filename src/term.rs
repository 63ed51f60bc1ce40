use crate::config::Grid;
use crate::food::FoodKind;
use crate::game::{Controller, Frame, Intents, Renderer};
use crate::snake::Direction;
use std::{io::{Stdout, Write, stdout}, time::Duration};

use crossterm::{cursor, execute, queue, style, terminal};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, poll, read};
use crossterm::style::Color;
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use tracing::warn;

/// Terminal position, column then row.
type TermCoords = (u16, u16);

/// Two terminal columns make up one grid cell.
type Glyph = (&'static str, Color);

const EMPTY: Glyph = ("  ", Color::Reset);
const BODY: Glyph = ("▓▓", Color::Green);
const DEAD: Glyph = ("XX", Color::Red);
const OBSTACLE: Glyph = ("██", Color::DarkGrey);
const BONUS: Glyph = ("$$", Color::Cyan);

/// Draws the board with crossterm, repainting only cells that changed since
/// the previous frame.
pub struct TermRenderer {
    grid: Grid,
    stdout: Stdout,
    screen: Vec<Glyph>,
    repaint: bool,
    current_msg: Option<Message>,
}

struct Message {
    top_left: TermCoords,
    width: u16,
    height: u16,
}

impl TermRenderer {
    pub fn new(grid: Grid) -> Self {
        TermRenderer {
            grid,
            stdout: stdout(),
            screen: vec![EMPTY; grid.area()],
            repaint: true,
            current_msg: None,
        }
    }

    /// Columns and rows needed for the board, its border and the status line.
    pub fn required_size(grid: Grid) -> TermCoords {
        (grid.width as u16 * 2 + 2, grid.height as u16 + 3)
    }

    pub fn setup(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, EnterAlternateScreen, cursor::Hide, cursor::DisableBlinking)?;
        terminal::enable_raw_mode()?;
        self.clear()
    }

    pub fn restore(&mut self) -> crossterm::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.stdout, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
    }

    /// Wipes everything, ready for a new game.
    pub fn clear(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, terminal::Clear(ClearType::All))?;
        self.current_msg = None;
        self.repaint = true;
        Ok(())
    }

    pub fn show_message(&mut self, lines: &[&str]) -> crossterm::Result<()> {
        if self.current_msg.is_some() {
            self.hide_message()?;
        }

        let (cols, rows) = Self::required_size(self.grid);
        let msg_height = lines.len() as u16 + 2;
        let msg_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let top_left = (
            (cols / 2).saturating_sub(msg_width / 2),
            (rows / 2).saturating_sub(msg_height / 2),
        );

        queue!(self.stdout, style::ResetColor)?;
        let blank = " ".repeat(msg_width as usize);
        for y in [top_left.1, top_left.1 + msg_height - 1].iter() {
            queue!(self.stdout, cursor::MoveTo(top_left.0, *y), style::Print(&blank))?;
        }

        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as u16 + 1;
            queue!(self.stdout, cursor::MoveTo(top_left.0, y), style::Print(padded_line))?;
        }

        self.current_msg = Some(Message { top_left, width: msg_width, height: msg_height });
        self.stdout.flush()?;
        Ok(())
    }

    /// Removes the message box. The board underneath is restored on the next
    /// render.
    pub fn hide_message(&mut self) -> crossterm::Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };

        let blank = " ".repeat(msg.width as usize);
        for y_diff in 0..msg.height {
            queue!(self.stdout, cursor::MoveTo(msg.top_left.0, msg.top_left.1 + y_diff), style::Print(&blank))?;
        }

        self.repaint = true;
        self.stdout.flush()?;
        Ok(())
    }

    ///////////////////////////////////////////////////////////////////////////

    fn draw(&mut self, frame: &Frame<'_>) -> crossterm::Result<()> {
        if self.current_msg.is_some() {
            self.hide_message()?;
        }

        let next = self.compose(frame);

        if self.repaint {
            self.draw_borders()?;
        }

        for (i, glyph) in next.iter().enumerate() {
            if self.repaint || self.screen[i] != *glyph {
                let x = (i % self.grid.width as usize) as u16;
                let y = (i / self.grid.width as usize) as u16;
                queue!(
                    self.stdout,
                    cursor::MoveTo(1 + 2 * x, 1 + y),
                    style::SetForegroundColor(glyph.1),
                    style::Print(glyph.0)
                )?;
            }
        }

        queue!(self.stdout, style::ResetColor)?;
        self.screen = next;
        self.repaint = false;
        self.stdout.flush()?;
        Ok(())
    }

    fn compose(&self, frame: &Frame<'_>) -> Vec<Glyph> {
        let mut next = vec![EMPTY; self.grid.area()];
        let width = self.grid.width as usize;
        let mut put = |(x, y): (i32, i32), glyph: Glyph| {
            if self.grid.contains((x, y)) {
                next[y as usize * width + x as usize] = glyph;
            }
        };

        for cell in frame.obstacles {
            put(*cell, OBSTACLE);
        }
        put(frame.food.position, food_glyph(frame.food.kind));
        if let Some(cell) = frame.bonus {
            put(cell, BONUS);
        }

        let alive = frame.snake.is_alive();
        for cell in frame.snake.body() {
            put(*cell, if alive { BODY } else { DEAD });
        }
        put(frame.snake.head_cell(), if alive { head_glyph(frame.snake.direction()) } else { DEAD });

        next
    }

    fn draw_borders(&mut self) -> crossterm::Result<()> {
        let (width, _) = Self::required_size(self.grid);
        let end_y = self.grid.height as u16 + 1;

        queue!(self.stdout, style::ResetColor)?;
        for x in 0..width {
            let ch = if x == 0 || x == width - 1 {'+'} else {'-'};
            queue!(self.stdout, cursor::MoveTo(x, 0), style::Print(ch))?;
            queue!(self.stdout, cursor::MoveTo(x, end_y), style::Print(ch))?;
        }

        for y in 1..end_y {
            queue!(self.stdout, cursor::MoveTo(0, y), style::Print('|'))?;
            queue!(self.stdout, cursor::MoveTo(width - 1, y), style::Print('|'))?;
        }

        Ok(())
    }

    fn draw_status(&mut self, score: u32, fps: u32) -> crossterm::Result<()> {
        let title = format!("Snake Score: {} FPS: {}", score, fps);
        let status = format!("Score: {:<6} FPS: {:<4} p: pause  q: quit", score, fps);
        let row = self.grid.height as u16 + 2;
        execute!(
            self.stdout,
            terminal::SetTitle(title.as_str()),
            cursor::MoveTo(0, row),
            style::ResetColor,
            style::Print(status)
        )
    }
}

impl Renderer for TermRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        if let Err(err) = self.draw(frame) {
            warn!(%err, "could not draw frame");
        }
    }

    fn render_game_over(&mut self) {
        if let Err(err) = self.show_message(&["Game over!"]) {
            warn!(%err, "could not draw game over");
        }
    }

    fn render_paused(&mut self) {
        if self.current_msg.is_some() {
            return;
        }
        if let Err(err) = self.show_message(&["Paused", "Press p to resume", "or q to quit"]) {
            warn!(%err, "could not draw pause overlay");
        }
    }

    fn update_title(&mut self, score: u32, fps: u32) {
        if let Err(err) = self.draw_status(score, fps) {
            warn!(%err, "could not update status line");
        }
    }
}

fn head_glyph(direction: Direction) -> Glyph {
    let text = match direction {
        Direction::Up => "^^",
        Direction::Down => "vv",
        Direction::Left => "<<",
        Direction::Right => ">>",
    };
    (text, Color::Green)
}

fn food_glyph(kind: FoodKind) -> Glyph {
    let color = match kind {
        FoodKind::Normal => Color::Yellow,
        FoodKind::SpecialScore => Color::Red,
        FoodKind::SpeedUp => Color::Magenta,
        FoodKind::SlowDown => Color::White,
    };
    ("()", color)
}

/// Keyboard input: arrows or WASD to steer, p to pause, q / Esc / Ctrl+C to quit.
pub struct TermController;

impl TermController {
    /// Blocks until the player picks: `true` to play again, `false` to quit.
    pub fn wait_restart_or_quit(&mut self) -> bool {
        loop {
            match read() {
                Ok(Event::Key(key)) => match key.code {
                    KeyCode::Char('r') => return true,
                    KeyCode::Char('q') | KeyCode::Esc => return false,
                    _ if is_ctrl_c(&key) => return false,
                    _ => {}
                },
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "could not read input");
                    return false;
                }
            }
        }
    }
}

impl Controller for TermController {
    fn poll_intents(&mut self) -> Intents {
        let mut intents = Intents::default();

        while let Ok(true) = poll(Duration::ZERO) {
            match read() {
                Ok(Event::Key(key)) => apply_key(&key, &mut intents),
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "could not read input");
                    break;
                }
            }
        }

        intents
    }
}

fn apply_key(key: &KeyEvent, intents: &mut Intents) {
    if is_ctrl_c(key) {
        intents.quit = true;
        return;
    }

    match key.code {
        KeyCode::Char('w') | KeyCode::Up => intents.direction = Some(Direction::Up),
        KeyCode::Char('a') | KeyCode::Left => intents.direction = Some(Direction::Left),
        KeyCode::Char('s') | KeyCode::Down => intents.direction = Some(Direction::Down),
        KeyCode::Char('d') | KeyCode::Right => intents.direction = Some(Direction::Right),
        KeyCode::Char('p') => intents.toggle_pause = !intents.toggle_pause,
        KeyCode::Char('q') | KeyCode::Esc => intents.quit = true,
        _ => {}
    }
}

fn is_ctrl_c(ev: &KeyEvent) -> bool {
    ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL)
}
