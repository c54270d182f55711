//! Whole-History Rating (WHR): Bayesian estimation of how the skill of every
//! player evolves over time, fitted jointly to all games ever played.
//!
//! Each player has one rating per time step at which they played. The
//! ratings of consecutive steps are linked by a Wiener process, and games
//! are scored with the Bradley-Terry model. The maximum a posteriori
//! trajectories are found by Newton's method, one player at a time.
//!
//! ```
//! use whr::{TimeStep, WholeHistoryRating, Winner};
//!
//! let mut whr = WholeHistoryRating::default();
//! whr.create_game("shusaku", "shusai", Winner::Black, TimeStep(1))?;
//! whr.create_game("shusaku", "shusai", Winner::White, TimeStep(2))?;
//! whr.create_game("shusaku", "shusai", Winner::White, TimeStep(2))?;
//! whr.iterate(50)?;
//!
//! let ratings = whr.ratings_for_player("shusai").unwrap_or_default();
//! assert_eq!(ratings.len(), 2);
//! assert!(ratings[1].elo.0 > 0.0);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod config;
mod error;
mod game;
mod player;
mod player_day;
mod time_step;
mod tridiagonal;
mod units;
mod whr;

pub use config::{WhrConfig, WhrConfigBuilder};
pub use error::{UnstableRating, UsageError};
pub use game::{Game, GameId, Winner, MAX_STABLE_GAMMA};
pub use player::{prior_precisions, DayRating, Player, PlayerId};
pub use player_day::{Derivatives, GameTerm, PlayerDay};
pub use time_step::{Steps, TimeStep};
pub use tridiagonal::{InverseBand, Tridiagonal};
pub use units::{
    elo_stdev, elo_variance_to_rating, rating_variance_to_elo, Elo, Rating, ELO_PER_RATING,
    RATING_PER_ELO,
};
pub use whr::WholeHistoryRating;
