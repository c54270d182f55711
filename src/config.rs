use crate::units::elo_variance_to_rating;

#[derive(Debug, Clone)]
pub struct WhrConfigBuilder {
    w: f64,
    prior_stdev: f64,
    verbose: bool,
}

impl Default for WhrConfigBuilder {
    fn default() -> WhrConfigBuilder {
        WhrConfigBuilder::new()
    }
}

impl WhrConfigBuilder {
    pub fn new() -> WhrConfigBuilder {
        WhrConfigBuilder {
            w: 30.0,
            prior_stdev: 400.0,
            verbose: false,
        }
    }

    /// Standard deviation on the Elo scale of the change of a rating over
    /// one unit of time.
    pub fn w(&mut self, w: f64) -> &mut Self {
        assert!(w > 0.0 && w.is_finite());
        self.w = w;
        self
    }

    /// Standard deviation on the Elo scale of the zero-mean prior over every
    /// rating.
    pub fn prior_stdev(&mut self, prior_stdev: f64) -> &mut Self {
        assert!(prior_stdev > 0.0 && prior_stdev.is_finite());
        self.prior_stdev = prior_stdev;
        self
    }

    /// Report every iteration pass at `info` level.
    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    pub fn build(&self) -> WhrConfig {
        WhrConfig {
            w: self.w,
            prior_stdev: self.prior_stdev,
            verbose: self.verbose,

            w2: elo_variance_to_rating(self.w * self.w),
            prior_var: elo_variance_to_rating(self.prior_stdev * self.prior_stdev),
        }
    }
}

/// Parameters of the rating model, with derived variances in natural units.
#[derive(Debug, Clone, PartialEq)]
pub struct WhrConfig {
    w: f64,
    prior_stdev: f64,
    verbose: bool,

    w2: f64,
    prior_var: f64,
}

impl Default for WhrConfig {
    fn default() -> WhrConfig {
        WhrConfig::new()
    }
}

impl WhrConfig {
    pub fn builder() -> WhrConfigBuilder {
        WhrConfigBuilder::default()
    }

    pub fn new() -> WhrConfig {
        WhrConfig::builder().build()
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn prior_stdev(&self) -> f64 {
        self.prior_stdev
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Variance of the Wiener process per unit of time, in natural units.
    pub fn w2(&self) -> f64 {
        self.w2
    }

    /// Variance of the prior, in natural units.
    pub fn prior_var(&self) -> f64 {
        self.prior_var
    }
}
