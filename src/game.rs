use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    error::{UnstableRating, UsageError},
    player::PlayerId,
    time_step::TimeStep,
    units::{Elo, Rating},
};

/// Largest opponent gamma that is still considered numerically stable.
/// Beyond this the ratings have diverged by thousands of Elo points and the
/// likelihood terms no longer carry useful information.
pub const MAX_STABLE_GAMMA: f64 = i64::MAX as f64;

/// Index of a game within the engine that created it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GameId(pub(crate) usize);

impl GameId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Side that won a game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Winner {
    Black,
    White,
}

impl FromStr for Winner {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Winner, UsageError> {
        Ok(match s {
            "B" => Winner::Black,
            "W" => Winner::White,
            _ => return Err(UsageError::InvalidWinner(s.to_owned())),
        })
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Winner::Black => "B",
            Winner::White => "W",
        })
    }
}

/// One side of a game: the player and the index of the day (in either the
/// fitting or the held-out day list of that player) the game is attached to.
#[derive(Debug, Clone)]
pub(crate) struct Side {
    pub id: PlayerId,
    pub name: Arc<str>,
    pub day: usize,
}

/// An immutable record of a contest between two distinct players.
///
/// Colors are an arbitrary labeling of the two sides. A positive handicap
/// favors black.
#[derive(Debug, Clone)]
pub struct Game {
    black: Side,
    white: Side,
    winner: Winner,
    time_step: TimeStep,
    handicap: Elo,
    held_out: bool,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "game {:?} (B) vs {:?} (W) at time step {}, handicap {}, winner {}",
            self.black.name, self.white.name, self.time_step, self.handicap.0, self.winner
        )
    }
}

impl Game {
    pub(crate) fn new(
        black: Side,
        white: Side,
        winner: Winner,
        time_step: TimeStep,
        handicap: Elo,
        held_out: bool,
    ) -> Game {
        debug_assert_ne!(black.id, white.id);
        Game {
            black,
            white,
            winner,
            time_step,
            handicap,
            held_out,
        }
    }

    pub fn black(&self) -> PlayerId {
        self.black.id
    }

    pub fn white(&self) -> PlayerId {
        self.white.id
    }

    pub fn black_name(&self) -> &str {
        &self.black.name
    }

    pub fn white_name(&self) -> &str {
        &self.white.name
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    pub fn handicap(&self) -> Elo {
        self.handicap
    }

    /// Whether the game is only used to evaluate predictions, not for
    /// fitting.
    pub fn is_held_out(&self) -> bool {
        self.held_out
    }

    pub fn winner_id(&self) -> PlayerId {
        match self.winner {
            Winner::Black => self.black.id,
            Winner::White => self.white.id,
        }
    }

    pub fn is_won_by(&self, player: PlayerId) -> bool {
        self.winner_id() == player
    }

    pub fn opponent(&self, player: PlayerId) -> Result<PlayerId, UsageError> {
        if player == self.black.id {
            Ok(self.white.id)
        } else if player == self.white.id {
            Ok(self.black.id)
        } else {
            Err(UsageError::NotAParticipant {
                game: self.to_string(),
            })
        }
    }

    /// Index of the day the game is attached to on the given player.
    pub(crate) fn day_of(&self, player: PlayerId) -> Option<usize> {
        if player == self.black.id {
            Some(self.black.day)
        } else if player == self.white.id {
            Some(self.white.day)
        } else {
            None
        }
    }

    /// Gamma of the opponent of `player`, adjusted by the handicap, as seen
    /// from the side of `player`.
    pub fn opponents_adjusted_gamma(
        &self,
        player: PlayerId,
        opponent_rating: Rating,
    ) -> Result<f64, UnstableRating> {
        let advantage = self.handicap.gamma();
        let gamma = if player == self.white.id {
            opponent_rating.gamma() * advantage
        } else {
            opponent_rating.gamma() / advantage
        };

        if gamma == 0.0 || !gamma.is_finite() || gamma > MAX_STABLE_GAMMA {
            return Err(UnstableRating {
                game: self.to_string(),
            });
        }
        Ok(gamma)
    }

    pub fn white_win_probability(&self, white: Rating, black: Rating) -> Result<f64, UnstableRating> {
        let gamma = white.gamma();
        Ok(gamma / (gamma + self.opponents_adjusted_gamma(self.white.id, black)?))
    }

    pub fn black_win_probability(&self, white: Rating, black: Rating) -> Result<f64, UnstableRating> {
        let gamma = black.gamma();
        Ok(gamma / (gamma + self.opponents_adjusted_gamma(self.black.id, white)?))
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn game(winner: Winner, handicap: f64) -> Game {
        Game::new(
            Side {
                id: PlayerId(0),
                name: Arc::from("black"),
                day: 0,
            },
            Side {
                id: PlayerId(1),
                name: Arc::from("white"),
                day: 0,
            },
            winner,
            TimeStep(1),
            Elo(handicap),
            false,
        )
    }

    fn elo(value: f64) -> Rating {
        Elo(value).to_rating()
    }

    #[test]
    fn test_even_game() {
        let game = game(Winner::White, 0.0);
        assert_eq!(game.white_win_probability(elo(500.0), elo(500.0)), Ok(0.5));
        assert_eq!(game.black_win_probability(elo(500.0), elo(500.0)), Ok(0.5));
    }

    #[test]
    fn test_known_value() {
        let game = game(Winner::White, 0.0);
        let p = game.white_win_probability(elo(100.0), elo(200.0)).unwrap();
        assert!((p - 0.359935).abs() < 5e-7);
        assert!((p - 1.0 / (1.0 + 10f64.powf(100.0 / 400.0))).abs() < 1e-12);
    }

    #[test]
    fn test_symmetry() {
        let game = game(Winner::Black, 0.0);
        for (white, black) in [(100.0, 200.0), (-350.0, 20.0), (1200.0, 1150.0), (0.0, 0.0)] {
            let p_white = game.white_win_probability(elo(white), elo(black)).unwrap();
            let p_black = game.black_win_probability(elo(white), elo(black)).unwrap();
            assert!((p_white - (1.0 - p_black)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_translation_invariance() {
        let game = game(Winner::Black, 0.0);
        let low = game.white_win_probability(elo(100.0), elo(200.0)).unwrap();
        let high = game.white_win_probability(elo(200.0), elo(300.0)).unwrap();
        assert!((low - high).abs() < 1e-12);
    }

    #[test]
    fn test_handicap_favors_black() {
        let game = game(Winner::Black, 100.0);
        let p_black = game.black_win_probability(elo(0.0), elo(0.0)).unwrap();
        assert!(p_black > 0.5);
        assert!((p_black - 1.0 / (1.0 + 10f64.powf(-100.0 / 400.0))).abs() < 1e-12);
        assert!((game.white_win_probability(elo(0.0), elo(0.0)).unwrap() - (1.0 - p_black)).abs() < 1e-12);
    }

    #[test]
    fn test_unstable() {
        let game = game(Winner::Black, 0.0);
        let err = game.white_win_probability(elo(0.0), elo(10_000.0)).unwrap_err();
        assert!(err.game.contains("\"black\" (B) vs \"white\" (W)"));
        assert!(game.black_win_probability(Rating(-1000.0), elo(0.0)).is_err());
        assert!(game.black_win_probability(Rating(f64::NAN), elo(0.0)).is_err());
    }

    #[test]
    fn test_opponent() {
        let game = game(Winner::Black, 0.0);
        assert_eq!(game.opponent(PlayerId(0)), Ok(PlayerId(1)));
        assert_eq!(game.opponent(PlayerId(1)), Ok(PlayerId(0)));
        assert!(matches!(
            game.opponent(PlayerId(2)),
            Err(UsageError::NotAParticipant { .. })
        ));
        assert!(game.is_won_by(PlayerId(0)));
        assert!(!game.is_won_by(PlayerId(1)));
    }

    #[test]
    fn test_parse_winner() {
        assert_eq!("B".parse(), Ok(Winner::Black));
        assert_eq!("W".parse(), Ok(Winner::White));
        assert_eq!(
            "D".parse::<Winner>(),
            Err(UsageError::InvalidWinner("D".to_owned()))
        );
        assert_eq!(
            "b".parse::<Winner>(),
            Err(UsageError::InvalidWinner("b".to_owned()))
        );
    }
}
