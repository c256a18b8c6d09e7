// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA[i] = mean(close[i - window + 1 ..= i])   for i >= window - 1
//
// The first `window - 1` entries are undefined. Output is aligned one-to-one
// with the input bars.
// =============================================================================

use crate::types::{IndicatorPoint, IndicatorSeries, PriceSeries};

/// Rolling arithmetic mean over the trailing `window` entries.
///
/// An output entry is `Some` only when all `window` trailing inputs are
/// defined. `window == 0` yields an all-`None` vector of the same length.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let window_f = window as f64;
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            values[i + 1 - window..=i]
                .iter()
                .try_fold(0.0_f64, |acc, v| v.map(|x| acc + x))
                .map(|sum| sum / window_f)
        })
        .collect()
}

/// Compute the moving average of close prices over `window` bars.
pub fn compute_moving_average(series: &PriceSeries, window: usize) -> IndicatorSeries {
    let closes: Vec<Option<f64>> = series.bars().iter().map(|b| Some(b.close)).collect();
    let means = rolling_mean(&closes, window);

    series
        .bars()
        .iter()
        .zip(means)
        .map(|(bar, value)| IndicatorPoint {
            date: bar.date,
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bar;
    use chrono::{Duration, NaiveDate};

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(start + Duration::days(i as i64), c, 100))
            .collect();
        PriceSeries::new("TEST", bars)
    }

    #[test]
    fn rolling_mean_basic() {
        let values = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(
            rolling_mean(&values, 2),
            vec![None, Some(1.5), Some(2.5), Some(3.5)]
        );
    }

    #[test]
    fn rolling_mean_undefined_input_poisons_window() {
        let values = [None, Some(2.0), Some(4.0), Some(6.0)];
        assert_eq!(rolling_mean(&values, 2), vec![None, None, Some(3.0), Some(5.0)]);
    }

    #[test]
    fn rolling_mean_window_zero() {
        assert_eq!(rolling_mean(&[Some(1.0), Some(2.0)], 0), vec![None, None]);
    }

    #[test]
    fn moving_average_alignment_and_values() {
        let closes: Vec<f64> = (1..=25).map(|x| x as f64).collect();
        let series = series_from(&closes);
        let ma = compute_moving_average(&series, 20);

        assert_eq!(ma.len(), series.len());
        for (point, date) in ma.iter().zip(series.dates()) {
            assert_eq!(point.date, date);
        }
        assert!(ma[..19].iter().all(|p| p.value.is_none()));
        for i in 19..25 {
            let expected: f64 = closes[i - 19..=i].iter().sum::<f64>() / 20.0;
            let got = ma[i].value.unwrap();
            assert!((got - expected).abs() < 1e-12, "index {i}: {got} != {expected}");
        }
    }

    #[test]
    fn moving_average_window_one_is_identity() {
        let series = series_from(&[3.0, 1.0, 4.0]);
        let ma = compute_moving_average(&series, 1);
        let values: Vec<f64> = ma.iter().map(|p| p.value.unwrap()).collect();
        assert_eq!(values, vec![3.0, 1.0, 4.0]);
    }

    #[test]
    fn moving_average_short_series_all_undefined() {
        let series = series_from(&[1.0, 2.0, 3.0]);
        let ma = compute_moving_average(&series, 20);
        assert_eq!(ma.len(), 3);
        assert!(ma.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn moving_average_empty_series() {
        let series = PriceSeries::empty("NONE");
        assert!(compute_moving_average(&series, 20).is_empty());
    }
}
