use std::{fmt, io};

#[derive(Debug)]
pub enum GameError {
    /// Not enough free cells left to place what was asked for.
    BoardFull { needed: usize, free: usize },
    InvalidGrid { width: i32, height: i32 },
    TimerSpawn(io::Error),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoardFull { needed, free } => {
                write!(f, "board full: needed {} free cells, found {}", needed, free)
            }
            Self::InvalidGrid { width, height } => {
                write!(f, "invalid grid size {}x{}", width, height)
            }
            Self::TimerSpawn(err) => write!(f, "could not start bonus timer: {}", err),
        }
    }
}

impl std::error::Error for GameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TimerSpawn(err) => Some(err),
            _ => None,
        }
    }
}
