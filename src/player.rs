use std::{f64::consts::PI, sync::Arc};

use crate::{
    cache::Cached,
    config::WhrConfig,
    error::UsageError,
    game::GameId,
    player_day::PlayerDay,
    time_step::TimeStep,
    tridiagonal::{InverseBand, Tridiagonal},
    units::{Elo, Rating},
};

/// Index of a player within the engine that created it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PlayerId(pub(crate) usize);

impl PlayerId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Estimated rating of a player at one of their days.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DayRating {
    pub time_step: TimeStep,
    pub elo: Elo,
    /// Available once the engine finalized an iteration.
    pub elo_stdev: Option<Elo>,
}

/// Rating trajectory of a single player: one [`PlayerDay`] per distinct time
/// step with games, linked by a Wiener process and a Gaussian prior.
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    name: Arc<str>,
    config: Arc<WhrConfig>,

    days: Vec<PlayerDay>,
    test_days: Vec<PlayerDay>,

    // Variance of the Wiener process between day i and day i + 1.
    wiener_variances: Cached<Vec<f64>>,
    prior_precisions: Cached<Vec<f64>>,
    covariance: Cached<InverseBand>,
}

impl Player {
    pub fn new(id: PlayerId, name: Arc<str>, config: Arc<WhrConfig>) -> Player {
        Player {
            id,
            name,
            config,
            days: Vec::new(),
            test_days: Vec::new(),
            wiener_variances: Cached::Dirty,
            prior_precisions: Cached::Dirty,
            covariance: Cached::Dirty,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn config(&self) -> &WhrConfig {
        &self.config
    }

    /// Overrides the configuration of this player only.
    pub fn set_config(&mut self, config: Arc<WhrConfig>) {
        self.config = config;
        self.invalidate_cache();
    }

    /// Marks every derived quantity for recomputation. Fitted ratings are
    /// kept, posterior variances are dropped.
    pub fn invalidate_cache(&mut self) {
        self.wiener_variances.invalidate();
        self.prior_precisions.invalidate();
        self.covariance.invalidate();
        for day in &mut self.days {
            day.clear_variance();
        }
    }

    pub fn days(&self) -> &[PlayerDay] {
        &self.days
    }

    pub(crate) fn days_mut(&mut self) -> &mut [PlayerDay] {
        self.covariance.invalidate();
        &mut self.days
    }

    /// Days holding games that are only used for evaluation.
    pub fn test_days(&self) -> &[PlayerDay] {
        &self.test_days
    }

    pub(crate) fn test_days_mut(&mut self) -> &mut [PlayerDay] {
        &mut self.test_days
    }

    fn day_list(&self, held_out: bool) -> &[PlayerDay] {
        if held_out {
            &self.test_days
        } else {
            &self.days
        }
    }

    /// Checks that a game at `time_step` can be attached without breaking
    /// chronological order.
    pub fn check_time_step(&self, time_step: TimeStep, held_out: bool) -> Result<(), UsageError> {
        match self.day_list(held_out).last() {
            Some(latest) if time_step < latest.time_step() => Err(UsageError::OutOfOrder {
                player: self.name.to_string(),
                time_step,
                latest: latest.time_step(),
            }),
            _ => Ok(()),
        }
    }

    /// Attaches a game to the day at `time_step`, creating the day if
    /// needed, and returns the index of the day.
    pub(crate) fn add_game(
        &mut self,
        time_step: TimeStep,
        game: GameId,
        won: bool,
        held_out: bool,
    ) -> Result<usize, UsageError> {
        self.check_time_step(time_step, held_out)?;

        let days = if held_out {
            &mut self.test_days
        } else {
            &mut self.days
        };

        let index = match days.last() {
            Some(latest) if latest.time_step() == time_step => days.len() - 1,
            latest => {
                let r = latest.map_or(Rating(0.0), PlayerDay::r);
                days.push(PlayerDay::new(time_step, r));
                days.len() - 1
            }
        };
        days[index].add_game(game, won);

        if !held_out {
            self.invalidate_cache();
        }
        Ok(index)
    }

    pub fn wiener_variances(&mut self) -> &[f64] {
        let days = &self.days;
        let w2 = self.config.w2();
        self.wiener_variances.get_or_insert_with(|| {
            days.windows(2)
                .map(|pair| f64::from(pair[1].time_step().elapsed_since(pair[0].time_step()).abs()) * w2)
                .collect()
        })
    }

    /// Recomputes the per-day prior precisions, such that the prior marginal
    /// variance of every day equals the configured prior variance.
    pub fn compute_prior_precisions(&mut self) -> &[f64] {
        self.prior_precisions.invalidate();
        self.prior_precisions()
    }

    pub fn prior_precisions(&mut self) -> &[f64] {
        if !self.prior_precisions.is_valid() {
            let prior_var = self.config.prior_var();
            let precisions = prior_precisions(prior_var, self.wiener_variances());
            self.prior_precisions = Cached::Valid(precisions);
        }
        self.prior_precisions.get_or_insert_with(Vec::new)
    }

    /// Joint log-probability of the whole trajectory: likelihood of the
    /// games, prior and Wiener process.
    pub fn log_probability(&mut self) -> f64 {
        let precisions = self.prior_precisions().to_vec();
        let wiener_variances = self.wiener_variances().to_vec();

        let mut sum = 0.0;
        for (day, precision) in self.days.iter_mut().zip(&precisions) {
            let r = f64::from(day.r());
            sum += -0.5 * precision * r * r + day.log_likelihood();
        }
        for (pair, sigma2) in self.days.windows(2).zip(&wiener_variances) {
            let dr = pair[1].r() - pair[0].r();
            sum += -0.5 * (2.0 * PI * sigma2).ln() - dr * dr / (2.0 * sigma2);
        }
        sum
    }

    pub fn gradient(&mut self) -> Vec<f64> {
        let precisions = self.prior_precisions().to_vec();
        let wiener_variances = self.wiener_variances().to_vec();
        let n = self.days.len();

        let mut gradient = Vec::with_capacity(n);
        for i in 0..n {
            let r = self.days[i].r();
            let mut g = self.days[i].log_likelihood_derivative() - f64::from(r) * precisions[i];
            if i > 0 {
                g -= (r - self.days[i - 1].r()) / wiener_variances[i - 1];
            }
            if i + 1 < n {
                g -= (r - self.days[i + 1].r()) / wiener_variances[i];
            }
            gradient.push(g);
        }
        gradient
    }

    pub fn hessian(&mut self) -> Tridiagonal {
        let precisions = self.prior_precisions().to_vec();
        let wiener_variances = self.wiener_variances().to_vec();

        let mut diagonal = Vec::with_capacity(self.days.len());
        for (i, day) in self.days.iter_mut().enumerate() {
            let mut h = day.log_likelihood_second_derivative() - precisions[i];
            if i > 0 {
                h -= 1.0 / wiener_variances[i - 1];
            }
            if let Some(sigma2) = wiener_variances.get(i) {
                h -= 1.0 / sigma2;
            }
            diagonal.push(h);
        }

        let off_diagonal = wiener_variances.iter().map(|sigma2| 1.0 / sigma2).collect();
        Tridiagonal::new(diagonal, off_diagonal)
    }

    pub fn gradient_norm(&mut self) -> f64 {
        self.gradient().iter().map(|g| g * g).sum::<f64>().sqrt()
    }

    /// Performs one Newton step on all ratings of the player.
    pub fn update_by_newton(&mut self) {
        match self.days.len() {
            0 => (),
            1 => self.update_by_1d_newton(),
            _ => self.update_by_ndim_newton(),
        }
        self.covariance.invalidate();
    }

    fn update_by_1d_newton(&mut self) {
        let precision = self.prior_precisions()[0];
        let day = &mut self.days[0];
        let r = f64::from(day.r());
        let gradient = day.log_likelihood_derivative() - r * precision;
        let hessian = day.log_likelihood_second_derivative() - precision;
        day.step(gradient / hessian);
    }

    fn update_by_ndim_newton(&mut self) {
        let gradient = self.gradient();
        let delta = self.hessian().solve(&gradient);
        for (day, delta) in self.days.iter_mut().zip(delta) {
            day.step(delta);
        }
    }

    /// Sum of the squares of the last Newton step of every day.
    pub fn squared_rdelta(&self) -> f64 {
        self.days.iter().map(|day| day.last_rdelta() * day.last_rdelta()).sum()
    }

    /// Approximates the posterior covariance by the negated inverse of the
    /// Hessian, and stores the variance of every day.
    pub fn update_covariance(&mut self) {
        let band = match self.days.len() {
            0 => InverseBand {
                variance: Vec::new(),
                covariance: Vec::new(),
            },
            1 => {
                let hessian = self.hessian();
                InverseBand {
                    variance: vec![-1.0 / hessian.diagonal[0]],
                    covariance: Vec::new(),
                }
            }
            _ => self.hessian().negated_inverse_band(),
        };
        for (day, &variance) in self.days.iter_mut().zip(&band.variance) {
            day.set_variance(variance);
        }
        self.covariance = Cached::Valid(band);
    }

    /// Posterior covariance band, if up to date.
    pub fn covariance(&self) -> Option<&InverseBand> {
        match &self.covariance {
            Cached::Valid(band) => Some(band),
            Cached::Dirty => None,
        }
    }

    /// Locates `time_step` relative to the recorded days.
    fn bracket(&self, time_step: TimeStep) -> Option<Bracket> {
        let first = self.days.first()?;
        let last = self.days.last()?;
        if time_step <= first.time_step() {
            return Some(Bracket::Day(0));
        }
        if time_step >= last.time_step() {
            return Some(Bracket::Day(self.days.len() - 1));
        }
        let after = self.days.partition_point(|day| day.time_step() <= time_step);
        let before = after - 1;
        if self.days[before].time_step() == time_step {
            return Some(Bracket::Day(before));
        }
        let span = self.days[after].time_step().elapsed_since(self.days[before].time_step());
        let elapsed = time_step.elapsed_since(self.days[before].time_step());
        Some(Bracket::Between {
            before,
            alpha: f64::from(elapsed) / f64::from(span),
            span: f64::from(span),
        })
    }

    /// Rating at an arbitrary time step, linearly interpolated between the
    /// bracketing days and clamped to the first and last day.
    pub fn r_at_time(&self, time_step: TimeStep) -> Option<Rating> {
        Some(match self.bracket(time_step)? {
            Bracket::Day(i) => self.days[i].r(),
            Bracket::Between { before, alpha, .. } => {
                let r0 = f64::from(self.days[before].r());
                let r1 = f64::from(self.days[before + 1].r());
                Rating((1.0 - alpha) * r0 + alpha * r1)
            }
        })
    }

    /// Posterior variance at an arbitrary time step, available after the
    /// covariance has been computed.
    ///
    /// Between two days this is the variance of a Brownian bridge pinned at
    /// the bracketing days, using only their joint posterior. This ignores
    /// information from further days and is an approximation. Outside the
    /// recorded range the variance of the nearest day is used, so a player
    /// with a single day has the variance of that day at every time step.
    pub fn var_at_time(&self, time_step: TimeStep) -> Option<f64> {
        let band = self.covariance()?;
        Some(match self.bracket(time_step)? {
            Bracket::Day(i) => band.variance[i],
            Bracket::Between {
                before,
                alpha,
                span,
            } => {
                let beta = 1.0 - alpha;
                beta * beta * band.variance[before]
                    + 2.0 * alpha * beta * band.covariance[before]
                    + alpha * alpha * band.variance[before + 1]
                    + alpha * beta * span * self.config.w2()
            }
        })
    }

    pub fn ratings(&self) -> Vec<DayRating> {
        self.days
            .iter()
            .map(|day| DayRating {
                time_step: day.time_step(),
                elo: day.elo(),
                elo_stdev: day.elo_stdev(),
            })
            .collect()
    }

    /// Log-likelihood of the held-out games, given that their terms and
    /// ratings have been refreshed.
    pub fn log_likelihood_test(&mut self) -> f64 {
        self.test_days.iter_mut().map(PlayerDay::log_likelihood).sum()
    }
}

enum Bracket {
    Day(usize),
    Between { before: usize, alpha: f64, span: f64 },
}

/// Prior precision of every day of a chain with the given Wiener variances
/// between consecutive days.
///
/// The prior is built forward as a chain of conditionals, starting from
/// `r_0 ~ N(0, prior_var)` and continuing with
/// `r_i | r_(i-1) ~ N(rho·r_(i-1), prior_var·(1 - rho²))`, so that every day
/// keeps the marginal variance `prior_var`. Each step solves
/// `k·rho² + rho - k = 0` with `k = prior_var / sigma2` for the correlation
/// at which the coupling of the two days equals the Wiener term `1/sigma2`.
/// The precisions are what remains on the diagonal of the joint precision
/// after subtracting the Wiener terms.
pub fn prior_precisions(prior_var: f64, wiener_variances: &[f64]) -> Vec<f64> {
    let mut precisions = Vec::with_capacity(wiener_variances.len() + 1);
    let mut current = 1.0 / prior_var;
    for &sigma2 in wiener_variances {
        let k = prior_var / sigma2;
        let rho = 2.0 * k / (1.0 + (1.0 + 4.0 * k * k).sqrt());
        // The conditional adds rho²/(prior_var·(1 - rho²)) to the current day
        // and 1/(prior_var·(1 - rho²)) to the next, net of
        // 1/sigma2 = rho/(prior_var·(1 - rho²)) on both.
        precisions.push(current - rho / (prior_var * (1.0 + rho)));
        current = 1.0 / (prior_var * (1.0 + rho));
    }
    precisions.push(current);
    precisions
}
