use std::{fmt, io, str::FromStr};

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;
use whr::{Elo, TimeStep, UsageError, WhrConfig, WholeHistoryRating, Winner};

/// One row of a game log, as exported from a game server.
#[serde_as]
#[derive(Deserialize, Debug)]
pub struct RawGame {
    pub black: String,
    pub white: String,
    #[serde_as(as = "DisplayFromStr")]
    pub winner: Winner,
    #[serde_as(as = "DisplayFromStr")]
    pub date: Date,
    #[serde(default)]
    pub handicap: Option<f64>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Date(NaiveDate);

impl FromStr for Date {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Date(NaiveDate::parse_from_str(s, "%Y-%m-%d")?))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Date {
    pub fn days_since(self, epoch: Date) -> TimeStep {
        TimeStep((self.0 - epoch.0).num_days())
    }
}

#[derive(Debug, Error)]
pub enum GameLogError {
    #[error("invalid game log: {0}")]
    Csv(#[from] csv::Error),
    #[error("game on {date} is not in chronological order (previous game on {previous})")]
    OutOfOrder { date: Date, previous: Date },
}

#[derive(Debug, Clone)]
pub struct LoggedGame {
    pub black: String,
    pub white: String,
    pub winner: Winner,
    pub time_step: TimeStep,
    pub handicap: Elo,
}

/// Chronologically sorted games, with dates converted to days since the
/// first game.
#[derive(Debug, Clone, Default)]
pub struct GameLog {
    games: Vec<LoggedGame>,
    last_date: Option<Date>,
}

impl GameLog {
    pub fn read<R: io::Read>(reader: R) -> Result<GameLog, GameLogError> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut log = GameLog::default();
        let mut epoch = None;

        for game in reader.deserialize() {
            let game: RawGame = game?;
            if let Some(previous) = log.last_date {
                if game.date < previous {
                    return Err(GameLogError::OutOfOrder {
                        date: game.date,
                        previous,
                    });
                }
            }
            log.last_date = Some(game.date);

            let epoch = *epoch.get_or_insert(game.date);
            log.games.push(LoggedGame {
                black: game.black,
                white: game.white,
                winner: game.winner,
                time_step: game.date.days_since(epoch),
                handicap: Elo(game.handicap.unwrap_or(0.0)),
            });
        }

        Ok(log)
    }

    pub fn games(&self) -> &[LoggedGame] {
        &self.games
    }

    pub fn last_date(&self) -> Option<Date> {
        self.last_date
    }

    pub fn player_count(&self) -> usize {
        let mut players = FxHashSet::default();
        for game in &self.games {
            players.insert(game.black.as_str());
            players.insert(game.white.as_str());
        }
        players.len()
    }

    /// Whether the game at `index` is held out for evaluation, given that
    /// every `holdout`-th game is held out (`0` to fit all games).
    pub fn is_held_out(index: usize, holdout: usize) -> bool {
        holdout != 0 && index % holdout == holdout - 1
    }

    /// Builds a rating engine with all games of the log.
    pub fn replay(&self, config: WhrConfig, holdout: usize) -> Result<WholeHistoryRating, UsageError> {
        let mut whr = WholeHistoryRating::new(config);
        for (index, game) in self.games.iter().enumerate() {
            if GameLog::is_held_out(index, holdout) {
                whr.create_test_game(&game.black, &game.white, game.winner, game.time_step, game.handicap)?;
            } else {
                whr.create_handicap_game(&game.black, &game.white, game.winner, game.time_step, game.handicap)?;
            }
        }
        Ok(whr)
    }
}
