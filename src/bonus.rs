use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::GameError;
use crate::Coords;

pub const BONUS_REWARD: u32 = 10;
/// Off-grid position of an inactive bonus.
pub const BONUS_SENTINEL: Coords = (-1, -1);

/// How a bonus episode was resolved, as seen by its timer thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeEnd {
    Consumed,
    Expired,
}

#[derive(Debug)]
struct BonusState {
    position: Coords,
    active: bool,
    episode: u64,
}

struct Shared {
    state: Mutex<BonusState>,
    wake: Condvar,
}

/// Time-limited bonus food, shared between the game loop and a timer thread.
///
/// Every read and write of the position and active flag goes through the
/// same lock. Whoever flips `active` back to false first (the game on
/// consumption, or the timer on expiry) resolves the episode.
#[derive(Clone)]
pub struct BonusFood {
    shared: Arc<Shared>,
    timeout: Duration,
}

impl BonusFood {
    pub fn new(timeout: Duration) -> Self {
        let state = BonusState { position: BONUS_SENTINEL, active: false, episode: 0 };
        BonusFood {
            shared: Arc::new(Shared { state: Mutex::new(state), wake: Condvar::new() }),
            timeout,
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock().active
    }

    /// Position of the active bonus, if any.
    pub fn position(&self) -> Option<Coords> {
        let state = self.shared.lock();
        if state.active {
            Some(state.position)
        } else {
            None
        }
    }

    /// Starts a new episode unless one is already running.
    ///
    /// `place` runs with the lock held, so placement and activation are one
    /// step as far as consumption is concerned. The timer thread is launched
    /// only after activation and its handle is returned; dropping it detaches
    /// the thread.
    pub fn start_episode<F>(&self, place: F) -> Result<Option<JoinHandle<EpisodeEnd>>, GameError>
    where
        F: FnOnce() -> Result<Coords, GameError>,
    {
        let episode = {
            let mut state = self.shared.lock();
            if state.active {
                return Ok(None);
            }

            state.position = place()?;
            state.active = true;
            state.episode += 1;
            info!(episode = state.episode, position = ?state.position, "bonus food spawned");
            state.episode
        };

        let shared = Arc::clone(&self.shared);
        let timeout = self.timeout;
        let spawned = thread::Builder::new()
            .name(format!("bonus-timer-{}", episode))
            .spawn(move || shared.run_timer(episode, timeout));

        match spawned {
            Ok(handle) => Ok(Some(handle)),
            Err(err) => {
                let mut state = self.shared.lock();
                state.active = false;
                state.position = BONUS_SENTINEL;
                Err(GameError::TimerSpawn(err))
            }
        }
    }

    /// Eats the bonus if it is active and sits on `cell`, waking the timer so
    /// it exits right away.
    pub fn try_consume(&self, cell: Coords) -> bool {
        let mut state = self.shared.lock();
        if !state.active || state.position != cell {
            return false;
        }

        state.active = false;
        state.position = BONUS_SENTINEL;
        self.shared.wake.notify_all();
        debug!(episode = state.episode, "bonus food eaten");
        true
    }
}

impl Shared {
    // The guarded data stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, BonusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_timer(&self, episode: u64, timeout: Duration) -> EpisodeEnd {
        let guard = self.lock();
        let (mut state, wait) = self
            .wake
            .wait_timeout_while(guard, timeout, |s| s.active && s.episode == episode)
            .unwrap_or_else(PoisonError::into_inner);

        if !wait.timed_out() {
            return EpisodeEnd::Consumed;
        }

        state.active = false;
        state.position = BONUS_SENTINEL;
        info!(episode, "bonus food expired");
        EpisodeEnd::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn starts_inactive() {
        let bonus = BonusFood::new(SHORT);
        assert!(!bonus.is_active());
        assert_eq!(bonus.position(), None);
        assert!(!bonus.try_consume(BONUS_SENTINEL));
    }

    #[test]
    fn second_episode_is_a_no_op() {
        let bonus = BonusFood::new(Duration::from_secs(30));
        let first = bonus.start_episode(|| Ok((3, 4))).unwrap();
        assert!(first.is_some());

        let second = bonus.start_episode(|| Ok((9, 9))).unwrap();
        assert!(second.is_none());
        assert_eq!(bonus.position(), Some((3, 4)));
        assert!(bonus.is_active());

        assert!(bonus.try_consume((3, 4)));
        assert_eq!(first.unwrap().join().unwrap(), EpisodeEnd::Consumed);
    }

    #[test]
    fn consumption_wakes_the_timer_early() {
        let bonus = BonusFood::new(Duration::from_secs(30));
        let timer = bonus.start_episode(|| Ok((5, 5))).unwrap().unwrap();

        assert!(!bonus.try_consume((5, 6)));
        assert!(bonus.is_active());

        let started = Instant::now();
        assert!(bonus.try_consume((5, 5)));
        assert_eq!(timer.join().unwrap(), EpisodeEnd::Consumed);
        assert!(started.elapsed() < Duration::from_secs(10));

        assert!(!bonus.is_active());
        assert_eq!(bonus.position(), None);
        assert!(!bonus.try_consume((5, 5)));
    }

    #[test]
    fn timeout_expires_the_episode() {
        let bonus = BonusFood::new(SHORT);
        let timer = bonus.start_episode(|| Ok((1, 2))).unwrap().unwrap();

        assert_eq!(timer.join().unwrap(), EpisodeEnd::Expired);
        assert!(!bonus.is_active());
        assert_eq!(bonus.shared.lock().position, BONUS_SENTINEL);
        assert!(!bonus.try_consume((1, 2)));
    }

    #[test]
    fn old_timer_leaves_new_episode_alone() {
        let bonus = BonusFood::new(Duration::from_millis(300));
        let first = bonus.start_episode(|| Ok((1, 1))).unwrap().unwrap();
        assert!(bonus.try_consume((1, 1)));

        let second = bonus.start_episode(|| Ok((2, 2))).unwrap().unwrap();
        assert_eq!(first.join().unwrap(), EpisodeEnd::Consumed);
        assert_eq!(bonus.position(), Some((2, 2)));

        assert_eq!(second.join().unwrap(), EpisodeEnd::Expired);
        assert_eq!(bonus.position(), None);
    }

    #[test]
    fn failed_placement_leaves_bonus_inactive() {
        let bonus = BonusFood::new(SHORT);
        let res = bonus.start_episode(|| Err(GameError::BoardFull { needed: 1, free: 0 }));
        assert!(res.is_err());
        assert!(!bonus.is_active());
    }
}
