use thiserror::Error;

use crate::time_step::TimeStep;

/// Misuse of the API. These are not retried or recovered from; the engine
/// state is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("player {player:?} cannot play a game against themselves")]
    SelfGame { player: String },
    #[error("game of {player:?} at time step {time_step} precedes their latest day at time step {latest}")]
    OutOfOrder {
        player: String,
        time_step: TimeStep,
        latest: TimeStep,
    },
    #[error("player is not a participant in {game}")]
    NotAParticipant { game: String },
    #[error("invalid winner {0:?}, expected \"B\" or \"W\"")]
    InvalidWinner(String),
}

/// A rating diverged so far that the adjusted gamma of an opponent became
/// zero, non-finite or too large for meaningful arithmetic. Callers may skip
/// the offending games or retry with a different configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unstable rating in {game}")]
pub struct UnstableRating {
    pub game: String,
}
