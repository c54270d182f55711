use crate::{
    cache::Cached,
    game::GameId,
    time_step::TimeStep,
    units::{elo_stdev, Elo, Rating},
};

/// Likelihood of one game as a function of the player's gamma `g`, in the
/// form `(a·g + b) / (c·g + d)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GameTerm {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl GameTerm {
    pub fn win(opponent_gamma: f64) -> GameTerm {
        GameTerm {
            a: 1.0,
            b: 0.0,
            c: 1.0,
            d: opponent_gamma,
        }
    }

    pub fn loss(opponent_gamma: f64) -> GameTerm {
        GameTerm {
            a: 0.0,
            b: opponent_gamma,
            c: 1.0,
            d: opponent_gamma,
        }
    }
}

/// Log-likelihood of the games of a day and its derivatives with respect to
/// the rating `r`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Derivatives {
    pub log_likelihood: f64,
    pub first: f64,
    pub second: f64,
}

/// Skill state of a player at one time step.
#[derive(Debug, Clone)]
pub struct PlayerDay {
    time_step: TimeStep,
    r: Rating,
    last_rdelta: f64,
    variance: Option<f64>,

    won_games: Vec<GameId>,
    lost_games: Vec<GameId>,

    // Opponent gammas as of the last refresh.
    won_terms: Vec<GameTerm>,
    lost_terms: Vec<GameTerm>,
    derivatives: Cached<Derivatives>,
}

impl PlayerDay {
    pub fn new(time_step: TimeStep, r: Rating) -> PlayerDay {
        PlayerDay {
            time_step,
            r,
            last_rdelta: 0.0,
            variance: None,
            won_games: Vec::new(),
            lost_games: Vec::new(),
            won_terms: Vec::new(),
            lost_terms: Vec::new(),
            derivatives: Cached::Dirty,
        }
    }

    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    pub fn r(&self) -> Rating {
        self.r
    }

    pub fn set_r(&mut self, r: Rating) {
        self.r = r;
        self.variance = None;
        self.derivatives.invalidate();
    }

    pub fn gamma(&self) -> f64 {
        self.r.gamma()
    }

    pub fn elo(&self) -> Elo {
        self.r.to_elo()
    }

    /// Size of the last Newton step applied to this day.
    pub fn last_rdelta(&self) -> f64 {
        self.last_rdelta
    }

    /// Applies a Newton step `r -= delta`.
    pub(crate) fn step(&mut self, delta: f64) {
        self.set_r(self.r - delta);
        self.last_rdelta = delta;
    }

    /// Posterior variance in natural units, available after the engine
    /// finalized an iteration and until the rating changes again.
    pub fn variance(&self) -> Option<f64> {
        self.variance
    }

    pub(crate) fn set_variance(&mut self, variance: f64) {
        self.variance = Some(variance);
    }

    pub(crate) fn clear_variance(&mut self) {
        self.variance = None;
    }

    pub fn elo_stdev(&self) -> Option<Elo> {
        self.variance.map(elo_stdev)
    }

    pub fn won_games(&self) -> &[GameId] {
        &self.won_games
    }

    pub fn lost_games(&self) -> &[GameId] {
        &self.lost_games
    }

    pub fn games(&self) -> impl Iterator<Item = GameId> + '_ {
        self.won_games.iter().chain(self.lost_games.iter()).copied()
    }

    pub fn num_games(&self) -> usize {
        self.won_games.len() + self.lost_games.len()
    }

    pub(crate) fn add_game(&mut self, game: GameId, won: bool) {
        if won {
            self.won_games.push(game);
        } else {
            self.lost_games.push(game);
        }
        self.won_terms.clear();
        self.lost_terms.clear();
        self.derivatives.invalidate();
    }

    pub fn set_game_terms(&mut self, won_terms: Vec<GameTerm>, lost_terms: Vec<GameTerm>) {
        self.won_terms = won_terms;
        self.lost_terms = lost_terms;
        self.derivatives.invalidate();
    }

    pub fn derivatives(&mut self) -> Derivatives {
        let gamma = self.gamma();
        let won_terms = &self.won_terms;
        let lost_terms = &self.lost_terms;
        *self
            .derivatives
            .get_or_insert_with(|| compute_derivatives(gamma, won_terms, lost_terms))
    }

    pub fn log_likelihood(&mut self) -> f64 {
        self.derivatives().log_likelihood
    }

    pub fn log_likelihood_derivative(&mut self) -> f64 {
        self.derivatives().first
    }

    pub fn log_likelihood_second_derivative(&mut self) -> f64 {
        self.derivatives().second
    }
}

fn compute_derivatives(gamma: f64, won_terms: &[GameTerm], lost_terms: &[GameTerm]) -> Derivatives {
    let mut log_likelihood = 0.0;
    let mut first = 0.0;
    let mut second = 0.0;

    for term in won_terms {
        let denominator = term.c * gamma + term.d;
        log_likelihood += (term.a * gamma).ln() - denominator.ln();
        first += term.c / denominator;
        second += term.c * term.d / (denominator * denominator);
    }

    for term in lost_terms {
        let denominator = term.c * gamma + term.d;
        log_likelihood += term.b.ln() - denominator.ln();
        first += term.c / denominator;
        second += term.c * term.d / (denominator * denominator);
    }

    Derivatives {
        log_likelihood,
        first: won_terms.len() as f64 - gamma * first,
        second: -gamma * second,
    }
}
