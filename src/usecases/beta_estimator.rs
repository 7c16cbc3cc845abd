//! Closed-form OLS of asset returns on market returns.
//!
//! `beta = Cov(X, Y) / Var(X)` and `alpha = mean(Y) - beta * mean(X)`, with X the
//! market and Y the asset. Both moments are taken as plain sums of centred
//! products, so the n / n-1 divisor cancels.

use crate::domain::errors::AnalyticsError;
use crate::domain::models::{AlignedReturns, RegressionResult};

pub fn estimate_beta(market: &[f64], asset: &[f64]) -> Result<RegressionResult, AnalyticsError> {
    if market.len() != asset.len() {
        return Err(AnalyticsError::LengthMismatch {
            market: market.len(),
            asset: asset.len(),
        });
    }
    let n = market.len();
    if n < 2 {
        return Err(AnalyticsError::InsufficientData(n));
    }

    let mean_x = market.iter().sum::<f64>() / n as f64;
    let mean_y = asset.iter().sum::<f64>() / n as f64;

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    for (x, y) in market.iter().zip(asset) {
        let dx = x - mean_x;
        ss_xy += dx * (y - mean_y);
        ss_xx += dx * dx;
    }

    // Constant returns leave only rounding noise in the centred sum
    let scale: f64 = market.iter().map(|x| x * x).sum();
    if ss_xx == 0.0 || ss_xx <= scale * f64::EPSILON {
        return Err(AnalyticsError::DegenerateInput);
    }

    let beta = ss_xy / ss_xx;
    Ok(RegressionResult {
        beta,
        alpha: mean_y - beta * mean_x,
        observations: n,
    })
}

/// Regresses the `asset` column on the `market` column of an aligned set.
pub fn estimate_from_aligned(
    aligned: &AlignedReturns,
    market: &str,
    asset: &str,
) -> Result<RegressionResult, AnalyticsError> {
    let x = aligned
        .column(market)
        .ok_or_else(|| AnalyticsError::MissingSeries(market.to_string()))?;
    let y = aligned
        .column(asset)
        .ok_or_else(|| AnalyticsError::MissingSeries(asset.to_string()))?;
    estimate_beta(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ReturnColumn;

    const MARKET: [f64; 6] = [0.010, -0.004, 0.007, 0.012, -0.009, 0.003];

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn recovers_exact_linear_relation() {
        let asset: Vec<f64> = MARKET.iter().map(|x| 1.5 * x + 0.0002).collect();
        let r = estimate_beta(&MARKET, &asset).unwrap();
        assert!(approx(r.beta, 1.5));
        assert!(approx(r.alpha, 0.0002));
        assert_eq!(r.observations, MARKET.len());
    }

    #[test]
    fn beta_matches_covariance_over_variance() {
        let asset = [0.02, -0.01, 0.004, 0.03, -0.02, 0.0];
        let r = estimate_beta(&MARKET, &asset).unwrap();

        let n = MARKET.len() as f64;
        let mx = MARKET.iter().sum::<f64>() / n;
        let my = asset.iter().sum::<f64>() / n;
        let cov: f64 = MARKET.iter().zip(&asset).map(|(x, y)| (x - mx) * (y - my)).sum::<f64>() / (n - 1.0);
        let var: f64 = MARKET.iter().map(|x| (x - mx).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(approx(r.beta, cov / var));
        assert!(approx(r.alpha, my - (cov / var) * mx));
    }

    #[test]
    fn scaling_asset_scales_beta_and_alpha() {
        let asset = [0.02, -0.01, 0.004, 0.03, -0.02, 0.0];
        let base = estimate_beta(&MARKET, &asset).unwrap();

        let k = 3.0;
        let scaled: Vec<f64> = asset.iter().map(|y| y * k).collect();
        let r = estimate_beta(&MARKET, &scaled).unwrap();
        assert!(approx(r.beta, base.beta * k));
        assert!(approx(r.alpha, base.alpha * k));
    }

    #[test]
    fn scaling_market_divides_beta() {
        let asset = [0.02, -0.01, 0.004, 0.03, -0.02, 0.0];
        let base = estimate_beta(&MARKET, &asset).unwrap();

        let k = 4.0;
        let scaled: Vec<f64> = MARKET.iter().map(|x| x * k).collect();
        let r = estimate_beta(&scaled, &asset).unwrap();
        assert!(approx(r.beta, base.beta / k));
    }

    #[test]
    fn flat_market_is_degenerate() {
        let flat = [0.0; 5];
        let asset = [0.01, 0.02, -0.01, 0.0, 0.03];
        assert_eq!(estimate_beta(&flat, &asset), Err(AnalyticsError::DegenerateInput));

        let constant = [0.004; 5];
        assert_eq!(
            estimate_beta(&constant, &asset),
            Err(AnalyticsError::DegenerateInput)
        );
    }

    #[test]
    fn too_few_points() {
        assert_eq!(estimate_beta(&[], &[]), Err(AnalyticsError::InsufficientData(0)));
        assert_eq!(
            estimate_beta(&[0.01], &[0.02]),
            Err(AnalyticsError::InsufficientData(1))
        );
    }

    #[test]
    fn mismatched_lengths() {
        assert_eq!(
            estimate_beta(&[0.01, 0.02], &[0.02]),
            Err(AnalyticsError::LengthMismatch { market: 2, asset: 1 })
        );
    }

    #[test]
    fn aligned_columns_are_selected_by_ticker() {
        let aligned = AlignedReturns {
            dates: vec![],
            columns: vec![
                ReturnColumn { ticker: "AAPL".into(), values: vec![0.02, 0.04, -0.02] },
                ReturnColumn { ticker: "^GSPC".into(), values: vec![0.01, 0.02, -0.01] },
            ],
        };
        let r = estimate_from_aligned(&aligned, "^GSPC", "AAPL").unwrap();
        assert!(approx(r.beta, 2.0));
        assert!(approx(r.alpha, 0.0));

        assert_eq!(
            estimate_from_aligned(&aligned, "^IXIC", "AAPL"),
            Err(AnalyticsError::MissingSeries("^IXIC".into()))
        );
    }
}
