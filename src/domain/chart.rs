// Chart projections of the visible replay window
use super::sample::Sample;
use super::scoring::{AngleSeries, score_all_angles};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub index: usize,
    pub label: String,
    pub mean: f64,
    pub ppm: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlopePoint {
    pub index: usize,
    pub label: String,
    pub slope: f64,
}

pub fn trend_series(window: &[Sample]) -> Vec<TrendPoint> {
    window
        .iter()
        .enumerate()
        .map(|(i, s)| TrendPoint {
            index: i + 1,
            label: s.label(i + 1),
            mean: s.mean_value,
            ppm: s.predicted_ppm,
            std_dev: s.std_dev,
        })
        .collect()
}

/// Samples without a slope are skipped; indices stay window-relative.
pub fn slope_series(window: &[Sample]) -> Vec<SlopePoint> {
    window
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            s.ppm_slope.map(|slope| SlopePoint {
                index: i + 1,
                label: s.label(i + 1),
                slope,
            })
        })
        .collect()
}

/// Everything the dashboard draws for one cursor position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowView {
    pub cursor: usize,
    pub samples: Vec<Sample>,
    pub trend: Vec<TrendPoint>,
    pub slope: Vec<SlopePoint>,
    pub angles: Vec<AngleSeries>,
}

impl WindowView {
    pub fn build(cursor: usize, window: &[Sample]) -> Self {
        Self {
            cursor,
            samples: window.to_vec(),
            trend: trend_series(window),
            slope: slope_series(window),
            angles: score_all_angles(window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::fixtures::nominal_sample;

    #[test]
    fn test_slope_series_skips_missing() {
        let mut a = nominal_sample();
        a.ppm_slope = Some(0.5);
        let b = nominal_sample();
        let mut c = nominal_sample();
        c.ppm_slope = Some(-1.25);

        let slope = slope_series(&[a, b, c]);
        assert_eq!(slope.len(), 2);
        assert_eq!(slope[0].index, 1);
        assert_eq!(slope[1].index, 3);
        assert_eq!(slope[1].slope, -1.25);
    }

    #[test]
    fn test_window_view() {
        let mut s = nominal_sample();
        s.mean_value = 0.02;
        s.predicted_ppm = 310.0;

        let view = WindowView::build(9, &[nominal_sample(), s]);
        assert_eq!(view.cursor, 9);
        assert_eq!(view.trend.len(), 2);
        assert_eq!(view.trend[1].ppm, 310.0);
        assert_eq!(view.angles.len(), 6);
        assert!(view.angles.iter().all(|a| a.points.len() == 2));
    }
}
