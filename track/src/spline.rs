use crate::error::{Error, Result};

/// Natural cubic spline through `(xs[i], ys[i])` knots.
///
/// Second derivatives vanish at both ends. Evaluation outside the knot range
/// extends the first or last segment's polynomial.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl NaturalCubicSpline {
    /// Fit a spline. Knots must be strictly increasing and at least two.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(Error::Interpolation(format!(
                "spline needs as many values ({}) as knots ({})",
                ys.len(),
                xs.len()
            )));
        }
        if xs.len() < 2 {
            return Err(Error::Interpolation("spline needs at least two knots".into()));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(Error::Interpolation("spline knots must be finite".into()));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Interpolation(
                "spline knots must have strictly increasing times".into(),
            ));
        }

        let n = xs.len();
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let mut m = vec![0.0; n];
        if n > 2 {
            // Tridiagonal solve over the interior knots.
            let mut cp = vec![0.0; n];
            let mut dp = vec![0.0; n];
            for i in 1..n - 1 {
                let a = h[i - 1];
                let b = 2.0 * (h[i - 1] + h[i]);
                let c = h[i];
                let d = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
                let denom = b - a * cp[i - 1];
                cp[i] = c / denom;
                dp[i] = (d - a * dp[i - 1]) / denom;
            }
            for i in (1..n - 1).rev() {
                m[i] = dp[i] - cp[i] * m[i + 1];
            }
        }

        Ok(Self { xs: xs.to_vec(), ys: ys.to_vec(), m })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let i = self
            .xs
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .min(n - 2);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a.powi(3) - a) * self.m[i] + (b.powi(3) - b) * self.m[i + 1]) * h * h / 6.0
    }
}
