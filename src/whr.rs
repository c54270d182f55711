use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, trace};

use crate::{
    config::WhrConfig,
    error::{UnstableRating, UsageError},
    game::{Game, GameId, Side, Winner},
    player::{DayRating, Player, PlayerId},
    player_day::{GameTerm, PlayerDay},
    time_step::TimeStep,
    units::{elo_stdev, Elo, Rating, RATING_PER_ELO},
};

type DayTerms = (Vec<GameTerm>, Vec<GameTerm>);

/// The rating engine: a registry of players and the games between them.
///
/// Games are added with [`WholeHistoryRating::create_game`], then
/// [`WholeHistoryRating::iterate`] fits the rating trajectories of all
/// players to the whole history at once.
#[derive(Debug, Clone)]
pub struct WholeHistoryRating {
    config: Arc<WhrConfig>,
    player_ids: FxHashMap<Arc<str>, PlayerId>,
    players: Vec<Player>,
    games: Vec<Game>,
}

impl Default for WholeHistoryRating {
    fn default() -> WholeHistoryRating {
        WholeHistoryRating::new(WhrConfig::default())
    }
}

impl WholeHistoryRating {
    pub fn new(config: WhrConfig) -> WholeHistoryRating {
        WholeHistoryRating {
            config: Arc::new(config),
            player_ids: FxHashMap::default(),
            players: Vec::new(),
            games: Vec::new(),
        }
    }

    pub fn config(&self) -> &WhrConfig {
        &self.config
    }

    /// Replaces the configuration of the engine and all players. Fitted
    /// ratings are kept as a starting point, everything derived from the
    /// configuration is recomputed on the next iteration.
    ///
    /// Per-player overrides made through [`WholeHistoryRating::player_mut`]
    /// are replaced as well. Players created later share the new
    /// configuration.
    pub fn set_config(&mut self, config: WhrConfig) {
        self.config = Arc::new(config);
        for player in &mut self.players {
            player.set_config(Arc::clone(&self.config));
        }
    }

    /// Gets the player with the given name, creating it if needed.
    pub fn player_by_name(&mut self, name: &str) -> PlayerId {
        if let Some(&id) = self.player_ids.get(name) {
            return id;
        }

        let id = PlayerId(self.players.len());
        let name: Arc<str> = Arc::from(name);
        debug!("new player {name:?} ({})", id.index());
        self.players
            .push(Player::new(id, Arc::clone(&name), Arc::clone(&self.config)));
        self.player_ids.insert(name, id);
        id
    }

    pub fn player_id(&self, name: &str) -> Option<PlayerId> {
        self.player_ids.get(name).copied()
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.player_id(name).map(|id| &self.players[id.0])
    }

    /// Mutable access to a player, for example to override its
    /// configuration. An override lasts until the next
    /// [`WholeHistoryRating::set_config`].
    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        let id = self.player_id(name)?;
        Some(&mut self.players[id.0])
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn game(&self, id: GameId) -> &Game {
        &self.games[id.0]
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn create_game(
        &mut self,
        black: &str,
        white: &str,
        winner: Winner,
        time_step: TimeStep,
    ) -> Result<GameId, UsageError> {
        self.add_game(black, white, winner, time_step, Elo(0.0), false)
    }

    /// Creates a game where black is given an advantage of `handicap`.
    pub fn create_handicap_game(
        &mut self,
        black: &str,
        white: &str,
        winner: Winner,
        time_step: TimeStep,
        handicap: Elo,
    ) -> Result<GameId, UsageError> {
        self.add_game(black, white, winner, time_step, handicap, false)
    }

    /// Creates a game that is not used for fitting, only for evaluating
    /// predictions with [`WholeHistoryRating::log_likelihood_test`].
    pub fn create_test_game(
        &mut self,
        black: &str,
        white: &str,
        winner: Winner,
        time_step: TimeStep,
        handicap: Elo,
    ) -> Result<GameId, UsageError> {
        self.add_game(black, white, winner, time_step, handicap, true)
    }

    fn add_game(
        &mut self,
        black: &str,
        white: &str,
        winner: Winner,
        time_step: TimeStep,
        handicap: Elo,
        held_out: bool,
    ) -> Result<GameId, UsageError> {
        if black == white {
            return Err(UsageError::SelfGame {
                player: black.to_owned(),
            });
        }

        for name in [black, white] {
            if let Some(player) = self.player(name) {
                player.check_time_step(time_step, held_out)?;
            }
        }

        let id = GameId(self.games.len());
        let black_id = self.player_by_name(black);
        let white_id = self.player_by_name(white);

        let black_day = self.players[black_id.0].add_game(time_step, id, winner == Winner::Black, held_out)?;
        let white_day = self.players[white_id.0].add_game(time_step, id, winner == Winner::White, held_out)?;

        self.games.push(Game::new(
            Side {
                id: black_id,
                name: self.players[black_id.0].shared_name(),
                day: black_day,
            },
            Side {
                id: white_id,
                name: self.players[white_id.0].shared_name(),
                day: white_day,
            },
            winner,
            time_step,
            handicap,
            held_out,
        ));
        Ok(id)
    }

    /// Current rating of `player` in `game`. Held-out games are evaluated at
    /// the fitted trajectory, interpolated to the time of the game.
    fn rating_in_game(&self, game: &Game, player: PlayerId) -> Rating {
        let player = &self.players[player.0];
        match game.day_of(player.id()) {
            Some(day) if !game.is_held_out() => player.days()[day].r(),
            _ => player.r_at_time(game.time_step()).unwrap_or_default(),
        }
    }

    fn opponent_rating(&self, game: &Game, player: PlayerId) -> Rating {
        let opponent = if game.black() == player {
            game.white()
        } else {
            game.black()
        };
        self.rating_in_game(game, opponent)
    }

    fn day_terms(&self, player: PlayerId, day: &PlayerDay) -> Result<DayTerms, UnstableRating> {
        let gamma = |id: &GameId| {
            let game = &self.games[id.0];
            game.opponents_adjusted_gamma(player, self.opponent_rating(game, player))
        };

        let won = day
            .won_games()
            .iter()
            .map(|id| gamma(id).map(GameTerm::win))
            .collect::<Result<_, _>>()?;
        let lost = day
            .lost_games()
            .iter()
            .map(|id| gamma(id).map(GameTerm::loss))
            .collect::<Result<_, _>>()?;
        Ok((won, lost))
    }

    fn fitting_terms(&self, player: PlayerId) -> Result<Vec<DayTerms>, UnstableRating> {
        self.players[player.0]
            .days()
            .iter()
            .map(|day| self.day_terms(player, day))
            .collect()
    }

    pub fn white_win_probability(&self, game: GameId) -> Result<f64, UnstableRating> {
        let game = &self.games[game.0];
        game.white_win_probability(
            self.rating_in_game(game, game.white()),
            self.rating_in_game(game, game.black()),
        )
    }

    pub fn black_win_probability(&self, game: GameId) -> Result<f64, UnstableRating> {
        let game = &self.games[game.0];
        game.black_win_probability(
            self.rating_in_game(game, game.white()),
            self.rating_in_game(game, game.black()),
        )
    }

    fn compute_prior_precisions(&mut self) {
        self.players.par_iter_mut().for_each(|player| {
            player.compute_prior_precisions();
        });
    }

    /// Performs one Newton step for every player, in order of registration,
    /// and returns the sum of the squared steps.
    pub fn run_one_iteration(&mut self) -> Result<f64, UnstableRating> {
        let mut squared_rdelta = 0.0;
        for index in 0..self.players.len() {
            let terms = self.fitting_terms(PlayerId(index))?;
            let player = &mut self.players[index];
            for (day, (won, lost)) in player.days_mut().iter_mut().zip(terms) {
                day.set_game_terms(won, lost);
            }
            player.update_by_newton();
            squared_rdelta += player.squared_rdelta();
        }
        Ok(squared_rdelta)
    }

    fn report_pass(&self, pass: usize, squared_rdelta: f64) {
        if self.config.verbose() {
            info!("iteration pass {pass}: squared step {squared_rdelta:e}");
        } else {
            trace!("iteration pass {pass}: squared step {squared_rdelta:e}");
        }
    }

    /// Computes the posterior variance of every day of every player.
    fn update_covariances(&mut self) -> Result<(), UnstableRating> {
        let terms = (0..self.players.len())
            .into_par_iter()
            .map(|index| self.fitting_terms(PlayerId(index)))
            .collect::<Result<Vec<_>, _>>()?;

        self.players
            .par_iter_mut()
            .zip(terms)
            .for_each(|(player, terms)| {
                for (day, (won, lost)) in player.days_mut().iter_mut().zip(terms) {
                    day.set_game_terms(won, lost);
                }
                player.update_covariance();
            });
        Ok(())
    }

    /// Runs exactly `count` passes of Newton updates over all players, then
    /// computes posterior variances.
    pub fn iterate(&mut self, count: usize) -> Result<(), UnstableRating> {
        self.compute_prior_precisions();
        for pass in 0..count {
            let squared_rdelta = self.run_one_iteration()?;
            self.report_pass(pass, squared_rdelta);
        }
        self.update_covariances()?;
        debug!(
            "iterated {count} passes over {} players and {} games",
            self.players.len(),
            self.games.len()
        );
        Ok(())
    }

    /// Runs passes until the sum of the squared steps of a pass falls below
    /// `elo_diff` (on the Elo scale), but at least `min_cycles` and, once
    /// `min_cycles` is reached, at most `max_cycles` passes. Returns the
    /// number of passes.
    pub fn iterate_until(
        &mut self,
        min_cycles: usize,
        max_cycles: usize,
        elo_diff: f64,
    ) -> Result<usize, UnstableRating> {
        let rdiff = elo_diff * RATING_PER_ELO;
        let threshold = rdiff * rdiff;

        self.compute_prior_precisions();
        let mut cycles = 0;
        loop {
            let squared_rdelta = self.run_one_iteration()?;
            self.report_pass(cycles, squared_rdelta);
            cycles += 1;
            if cycles >= min_cycles && (squared_rdelta < threshold || cycles >= max_cycles) {
                break;
            }
        }
        self.update_covariances()?;
        debug!("converged after {cycles} passes");
        Ok(cycles)
    }

    pub fn ratings_for_player(&self, name: &str) -> Option<Vec<DayRating>> {
        self.player(name).map(Player::ratings)
    }

    /// Interpolated rating and, if available, its standard deviation at an
    /// arbitrary time step, on the Elo scale.
    pub fn rating_at(&self, name: &str, time_step: TimeStep) -> Option<(Elo, Option<Elo>)> {
        let player = self.player(name)?;
        let r = player.r_at_time(time_step)?;
        Some((r.to_elo(), player.var_at_time(time_step).map(elo_stdev)))
    }

    /// Euclidean norm of the gradient of the log-probability of all
    /// players at the current ratings.
    pub fn gradient_norm(&self) -> Result<f64, UnstableRating> {
        let squares = self
            .players
            .par_iter()
            .map(|player| {
                let terms = self.fitting_terms(player.id())?;
                let mut player = player.clone();
                for (day, (won, lost)) in player.days_mut().iter_mut().zip(terms) {
                    day.set_game_terms(won, lost);
                }
                Ok::<_, UnstableRating>(player.gradient().iter().map(|g| g * g).sum::<f64>())
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(squares.iter().sum::<f64>().sqrt())
    }

    /// Log-likelihood of the held-out games under the fitted trajectories.
    ///
    /// Only players with at least two fitted days and two held-out days are
    /// scored. A game counts once for each scored participant.
    pub fn log_likelihood_test(&mut self) -> Result<f64, UnstableRating> {
        let scored: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|player| player.days().len() >= 2 && player.test_days().len() >= 2)
            .map(Player::id)
            .collect();

        let mut total = 0.0;
        for id in scored {
            let player = &self.players[id.0];
            let test_days = player
                .test_days()
                .iter()
                .map(|day| {
                    let r = player.r_at_time(day.time_step()).unwrap_or_default();
                    self.day_terms(id, day).map(|terms| (r, terms))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let player = &mut self.players[id.0];
            for (day, (r, (won, lost))) in player.test_days_mut().iter_mut().zip(test_days) {
                day.set_r(r);
                day.set_game_terms(won, lost);
            }
            total += player.log_likelihood_test();
        }
        Ok(total)
    }
}
