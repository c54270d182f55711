use std::{
    f64::consts::LN_10,
    ops::{Add, Neg, Sub},
};

/// Number of Elo points per natural rating unit.
pub const ELO_PER_RATING: f64 = 400.0 / LN_10;

/// Number of natural rating units per Elo point.
pub const RATING_PER_ELO: f64 = LN_10 / 400.0;

/// Latent playing strength in natural units, such that the probability of
/// winning against an opponent is `gamma / (gamma + opponent_gamma)` with
/// `gamma = exp(r)`. Higher is better.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Rating(pub f64);

impl From<Rating> for f64 {
    #[inline]
    fn from(Rating(r): Rating) -> f64 {
        r
    }
}

impl From<f64> for Rating {
    #[inline]
    fn from(r: f64) -> Rating {
        Rating(r)
    }
}

impl From<Elo> for Rating {
    #[inline]
    fn from(Elo(elo): Elo) -> Rating {
        Rating(elo * RATING_PER_ELO)
    }
}

impl Rating {
    /// Multiplicative strength factor `exp(r)`.
    #[inline]
    pub fn gamma(self) -> f64 {
        self.0.exp()
    }

    #[inline]
    pub fn from_gamma(gamma: f64) -> Rating {
        Rating(gamma.ln())
    }

    #[inline]
    pub fn to_elo(self) -> Elo {
        Elo::from(self)
    }
}

impl Sub<f64> for Rating {
    type Output = Rating;

    #[inline]
    fn sub(self, rhs: f64) -> Rating {
        Rating(self.0 - rhs)
    }
}

impl Sub<Rating> for Rating {
    type Output = f64;

    #[inline]
    fn sub(self, rhs: Rating) -> f64 {
        self.0 - rhs.0
    }
}

/// A rating, rating difference or handicap on the familiar Elo scale, where
/// a difference of 400 points corresponds to odds of 10:1.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Elo(pub f64);

impl From<Elo> for f64 {
    #[inline]
    fn from(Elo(elo): Elo) -> f64 {
        elo
    }
}

impl From<f64> for Elo {
    #[inline]
    fn from(elo: f64) -> Elo {
        Elo(elo)
    }
}

impl From<Rating> for Elo {
    #[inline]
    fn from(Rating(r): Rating) -> Elo {
        Elo(r * ELO_PER_RATING)
    }
}

impl Elo {
    #[inline]
    pub fn to_rating(self) -> Rating {
        Rating::from(self)
    }

    /// Multiplicative strength factor `10^(elo / 400)`.
    #[inline]
    pub fn gamma(self) -> f64 {
        self.to_rating().gamma()
    }
}

impl Add for Elo {
    type Output = Elo;

    #[inline]
    fn add(self, rhs: Elo) -> Elo {
        Elo(self.0 + rhs.0)
    }
}

impl Sub for Elo {
    type Output = Elo;

    #[inline]
    fn sub(self, rhs: Elo) -> Elo {
        Elo(self.0 - rhs.0)
    }
}

impl Neg for Elo {
    type Output = Elo;

    #[inline]
    fn neg(self) -> Elo {
        Elo(-self.0)
    }
}

/// Converts a variance on the Elo scale to natural units.
#[inline]
pub fn elo_variance_to_rating(variance: f64) -> f64 {
    variance * RATING_PER_ELO * RATING_PER_ELO
}

/// Converts a variance in natural units to the Elo scale.
#[inline]
pub fn rating_variance_to_elo(variance: f64) -> f64 {
    variance * ELO_PER_RATING * ELO_PER_RATING
}

/// Standard deviation on the Elo scale of a variance in natural units.
#[inline]
pub fn elo_stdev(variance: f64) -> Elo {
    Elo(variance.sqrt() * ELO_PER_RATING)
}

#[cfg(test)]
mod tests {

    use super::*;

    const SWEEP: [f64; 9] = [0.0, 1e-9, -1e-9, 0.5, -0.5, 7.25, -7.25, 300.0, -300.0];

    #[test]
    fn test_elo_round_trip() {
        for r in SWEEP {
            assert!((Rating(r).to_elo().to_rating().0 - r).abs() <= 1e-14 * r.abs());
        }
    }

    #[test]
    fn test_gamma_round_trip() {
        for r in SWEEP {
            assert!((Rating::from_gamma(Rating(r).gamma()).0 - r).abs() < 1e-12);
        }
    }

    #[test]
    fn test_variance_round_trip() {
        for v in [0.0, 1e-6, 1.0, 160_000.0] {
            assert!((rating_variance_to_elo(elo_variance_to_rating(v)) - v).abs() <= 1e-14 * v);
        }
    }

    #[test]
    fn test_known_values() {
        assert!((Elo(400.0).gamma() - 10.0).abs() < 1e-13);
        assert!((Elo(-400.0).gamma() - 0.1).abs() < 1e-15);
        assert!((Rating(1.0).to_elo().0 - 173.717_792_761_300_73).abs() < 1e-10);
        assert!((elo_stdev(elo_variance_to_rating(400.0 * 400.0)).0 - 400.0).abs() < 1e-11);
    }
}
