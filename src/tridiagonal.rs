/// Symmetric tridiagonal matrix, as arises for the Hessian of a chain of
/// ratings where each day is only coupled to its chronological neighbors.
#[derive(Debug, Clone, PartialEq)]
pub struct Tridiagonal {
    /// Entries `(i, i)`.
    pub diagonal: Vec<f64>,
    /// Entries `(i, i + 1)`, equal to `(i + 1, i)`. One shorter than the
    /// diagonal.
    pub off_diagonal: Vec<f64>,
}

/// Band of the negated inverse of a tridiagonal matrix. For a negative
/// definite Hessian this is the covariance of the Laplace approximation.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseBand {
    pub variance: Vec<f64>,
    /// Covariance of days `i` and `i + 1`.
    pub covariance: Vec<f64>,
}

impl Tridiagonal {
    pub fn new(diagonal: Vec<f64>, off_diagonal: Vec<f64>) -> Tridiagonal {
        assert_eq!(diagonal.len(), off_diagonal.len() + 1);
        Tridiagonal {
            diagonal,
            off_diagonal,
        }
    }

    pub fn len(&self) -> usize {
        self.diagonal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagonal.is_empty()
    }

    /// Solves `self · x = rhs` by LU decomposition without pivoting.
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.len();
        assert_eq!(rhs.len(), n);
        if n == 0 {
            return Vec::new();
        }

        // L has unit diagonal and sub-diagonal a, U has diagonal d and
        // super-diagonal equal to the off-diagonal of the matrix.
        let mut a = vec![0.0; n];
        let mut d = vec![0.0; n];
        d[0] = self.diagonal[0];
        for i in 1..n {
            a[i] = self.off_diagonal[i - 1] / d[i - 1];
            d[i] = self.diagonal[i] - a[i] * self.off_diagonal[i - 1];
        }

        let mut y = vec![0.0; n];
        y[0] = rhs[0];
        for i in 1..n {
            y[i] = rhs[i] - a[i] * y[i - 1];
        }

        let mut x = vec![0.0; n];
        x[n - 1] = y[n - 1] / d[n - 1];
        for i in (0..n - 1).rev() {
            x[i] = (y[i] - self.off_diagonal[i] * x[i + 1]) / d[i];
        }
        x
    }

    /// Diagonal and first off-diagonal of `-self⁻¹`, from a forward (LU)
    /// and a backward (UL) decomposition.
    pub fn negated_inverse_band(&self) -> InverseBand {
        let n = self.len();
        if n == 0 {
            return InverseBand {
                variance: Vec::new(),
                covariance: Vec::new(),
            };
        }

        let mut a = vec![0.0; n];
        let mut d = vec![0.0; n];
        d[0] = self.diagonal[0];
        for i in 1..n {
            a[i] = self.off_diagonal[i - 1] / d[i - 1];
            d[i] = self.diagonal[i] - a[i] * self.off_diagonal[i - 1];
        }

        let mut dp = vec![0.0; n];
        dp[n - 1] = self.diagonal[n - 1];
        for i in (0..n - 1).rev() {
            let ap = self.off_diagonal[i] / dp[i + 1];
            dp[i] = self.diagonal[i] - ap * self.off_diagonal[i];
        }

        let mut variance = vec![0.0; n];
        for i in 0..n - 1 {
            let b = self.off_diagonal[i];
            variance[i] = dp[i + 1] / (b * b - d[i] * dp[i + 1]);
        }
        variance[n - 1] = -1.0 / d[n - 1];

        let covariance = (0..n - 1).map(|i| -a[i + 1] * variance[i + 1]).collect();

        InverseBand {
            variance,
            covariance,
        }
    }
}
