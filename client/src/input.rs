//! Bot input: scripted or random-walk directions with change detection

use rand::Rng;
use shared::Direction;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Resend an unchanged direction this often so the server keeps seeing us.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("script is empty")]
    Empty,
    #[error("unknown step '{0}', expected one of u d l r s")]
    UnknownStep(char),
}

/// Parses a script such as `"rrrdds"`. Whitespace and commas are ignored.
pub fn parse_script(script: &str) -> Result<Vec<Direction>, ScriptError> {
    let steps = script
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| match c.to_ascii_lowercase() {
            'u' => Ok(Direction::Up),
            'd' => Ok(Direction::Down),
            'l' => Ok(Direction::Left),
            'r' => Ok(Direction::Right),
            's' => Ok(Direction::Stop),
            other => Err(ScriptError::UnknownStep(other)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if steps.is_empty() {
        return Err(ScriptError::Empty);
    }
    Ok(steps)
}

#[derive(Debug, Clone)]
pub enum InputSource {
    /// Cycles through the steps forever.
    Script { steps: Vec<Direction>, cursor: usize },
    /// Holds a direction for a few steps, then picks a new one.
    RandomWalk { current: Direction, remaining: u32 },
}

impl InputSource {
    pub fn script(steps: Vec<Direction>) -> Self {
        InputSource::Script { steps, cursor: 0 }
    }

    pub fn random_walk() -> Self {
        InputSource::RandomWalk {
            current: Direction::Stop,
            remaining: 0,
        }
    }

    pub fn next_direction(&mut self) -> Direction {
        match self {
            InputSource::Script { steps, cursor } => {
                let direction = steps.get(*cursor).copied().unwrap_or(Direction::Stop);
                *cursor = (*cursor + 1) % steps.len().max(1);
                direction
            }
            InputSource::RandomWalk { current, remaining } => {
                if *remaining == 0 {
                    let mut rng = rand::thread_rng();
                    *current = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
                    *remaining = rng.gen_range(2..8);
                }
                *remaining -= 1;
                *current
            }
        }
    }
}

/// Turns the input source into what actually goes on the wire.
pub struct InputManager {
    source: InputSource,
    current: Direction,
    last_sent: Option<(Direction, Instant)>,
}

impl InputManager {
    pub fn new(source: InputSource) -> Self {
        Self {
            source,
            current: Direction::Stop,
            last_sent: None,
        }
    }

    /// Advances the source by one step. Returns the direction to send, if
    /// it changed or the keep-alive is due.
    pub fn update(&mut self, now: Instant) -> Option<Direction> {
        self.current = self.source.next_direction();

        let should_send = match self.last_sent {
            None => true,
            Some((sent, at)) => {
                sent != self.current || now.saturating_duration_since(at) >= KEEP_ALIVE_INTERVAL
            }
        };

        if should_send {
            self.last_sent = Some((self.current, now));
            Some(self.current)
        } else {
            None
        }
    }

    /// The most recent intent, sent or not.
    pub fn current(&self) -> Direction {
        self.current
    }

    /// Forget what was sent, so the next update always goes out. Used after a
    /// reconnect.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
