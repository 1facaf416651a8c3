// Outlier-adjusted deviation scoring for the six monitored phase angles
use super::sample::Sample;
use serde::Serialize;

/// Fixed deviation tolerance shared by every phase angle
pub const DEVIATION_TOLERANCE: f64 = 2.5;

/// Static configuration of one monitored phase angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleReference {
    pub angle_index: usize,
    pub name: &'static str,
    pub column: &'static str,
    pub reference_value: f64,
    pub tolerance: f64,
}

const fn angle(
    angle_index: usize,
    name: &'static str,
    column: &'static str,
    reference_value: f64,
) -> AngleReference {
    AngleReference {
        angle_index,
        name,
        column,
        reference_value,
        tolerance: DEVIATION_TOLERANCE,
    }
}

/// Slot order matches `angle_1..angle_6` on the wire; the display names follow
/// the physical numbering on the camshaft, which is not sequential.
pub const PHASE_ANGLES: [AngleReference; 6] = [
    angle(0, "Phase Angle 1", "d072", 52.08),
    angle(1, "Phase Angle 2", "d077", 52.08),
    angle(2, "Phase Angle 5", "d082", -292.08),
    angle(3, "Phase Angle 6", "d087", -292.08),
    angle(4, "Phase Angle 3", "d092", 172.08),
    angle(5, "Phase Angle 4", "d097", 172.08),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleStatus {
    Unknown,
    Excellent,
    Good,
    Warning,
    Critical,
    Severe,
}

impl AngleStatus {
    pub fn from_ratio(deviation_ratio: f64) -> Self {
        if deviation_ratio <= 0.5 {
            AngleStatus::Excellent
        } else if deviation_ratio <= 1.0 {
            AngleStatus::Good
        } else if deviation_ratio <= 2.0 {
            AngleStatus::Warning
        } else if deviation_ratio <= 4.0 {
            AngleStatus::Critical
        } else {
            AngleStatus::Severe
        }
    }

    pub fn severity(self) -> u8 {
        match self {
            AngleStatus::Unknown => 0,
            AngleStatus::Excellent => 1,
            AngleStatus::Good => 2,
            AngleStatus::Warning => 3,
            AngleStatus::Critical => 4,
            AngleStatus::Severe => 5,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            AngleStatus::Unknown => "#666666",
            AngleStatus::Excellent => "#4CAF50",
            AngleStatus::Good => "#8BC34A",
            AngleStatus::Warning => "#FF9800",
            AngleStatus::Critical => "#F44336",
            AngleStatus::Severe => "#8B0000",
        }
    }
}

/// Piecewise-linear defect rate in percent, unrounded.
pub fn defect_rate_for_ratio(deviation_ratio: f64) -> f64 {
    if deviation_ratio <= 0.5 {
        0.0
    } else if deviation_ratio <= 1.0 {
        deviation_ratio * 5.0
    } else if deviation_ratio <= 2.0 {
        5.0 + (deviation_ratio - 1.0) * 20.0
    } else if deviation_ratio <= 4.0 {
        25.0 + (deviation_ratio - 2.0) * 25.0
    } else {
        (75.0 + (deviation_ratio - 4.0) * 6.25).min(100.0)
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deviation verdict for a single reading against one angle reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleAssessment {
    pub status: AngleStatus,
    pub severity: u8,
    pub color: &'static str,
    pub deviation: f64,
    pub deviation_ratio: f64,
    /// Percent, rounded to one decimal
    pub defect_rate: f64,
    pub reference_value: f64,
}

impl AngleAssessment {
    pub fn unknown(reference: &AngleReference) -> Self {
        Self {
            status: AngleStatus::Unknown,
            severity: 0,
            color: AngleStatus::Unknown.color(),
            deviation: 0.0,
            deviation_ratio: 0.0,
            defect_rate: 0.0,
            reference_value: reference.reference_value,
        }
    }

    /// Warning-or-worse, or more than 10% projected defects
    pub fn is_defect_predicted(&self) -> bool {
        self.severity >= 3 || self.defect_rate > 10.0
    }
}

/// Missing or non-finite readings are `Unknown`, never alerting.
pub fn assess(value: Option<f64>, reference: &AngleReference) -> AngleAssessment {
    let value = match value {
        Some(v) if v.is_finite() => v,
        _ => return AngleAssessment::unknown(reference),
    };

    let deviation = (value - reference.reference_value).abs();
    let deviation_ratio = deviation / reference.tolerance;
    let status = AngleStatus::from_ratio(deviation_ratio);

    AngleAssessment {
        status,
        severity: status.severity(),
        color: status.color(),
        deviation,
        deviation_ratio,
        defect_rate: round_one_decimal(defect_rate_for_ratio(deviation_ratio)),
        reference_value: reference.reference_value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierAdjustedValue {
    /// Display value, clamped into the adjusted bounds; `None` if unusable
    pub value: Option<f64>,
    pub is_outlier: bool,
    pub original_value: Option<f64>,
}

/// Clamp bounds for a window, anchored to the reference value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// IQR fences tightened to `reference ± |reference| / 2`. `None` when no
    /// finite value is present.
    pub fn compute(values: &[f64], reference_value: f64) -> Option<Self> {
        let mut valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if valid.is_empty() {
            return None;
        }
        valid.sort_by(f64::total_cmp);

        let n = valid.len();
        let q1 = valid[(n as f64 * 0.25).floor() as usize];
        let q3 = valid[(n as f64 * 0.75).floor() as usize];
        let iqr = q3 - q1;

        let anchor = reference_value.abs() * 0.5;
        Some(Self {
            lower: (q1 - 1.5 * iqr).max(reference_value - anchor),
            upper: (q3 + 1.5 * iqr).min(reference_value + anchor),
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Nearest-bound clamp. The bounds may cross when the whole window sits
    /// far from the reference, so this cannot use `f64::clamp`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.min(self.upper).max(self.lower)
    }
}

pub fn adjust_outliers(values: &[f64], reference_value: f64) -> Vec<OutlierAdjustedValue> {
    let bounds = OutlierBounds::compute(values, reference_value);

    values
        .iter()
        .map(|&raw| match bounds {
            Some(bounds) if raw.is_finite() => {
                let is_outlier = !bounds.contains(raw);
                OutlierAdjustedValue {
                    value: Some(if is_outlier { bounds.clamp(raw) } else { raw }),
                    is_outlier,
                    original_value: Some(raw),
                }
            }
            _ => OutlierAdjustedValue {
                value: None,
                is_outlier: false,
                original_value: None,
            },
        })
        .collect()
}

/// One chart point of an angle series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPoint {
    /// 1-based position inside the visible window
    pub index: usize,
    pub label: String,
    pub value: Option<f64>,
    pub is_outlier: bool,
    pub original_value: Option<f64>,
    pub defect_rate: f64,
    pub reference_value: f64,
}

/// Score a visible window for one angle. Missing readings stand in as the
/// reference value so they do not skew the fences.
pub fn score_window(window: &[Sample], reference: &AngleReference) -> Vec<ScoredPoint> {
    let raw: Vec<f64> = window
        .iter()
        .map(|s| s.angle(reference.angle_index).unwrap_or(reference.reference_value))
        .collect();

    adjust_outliers(&raw, reference.reference_value)
        .into_iter()
        .zip(window)
        .enumerate()
        .map(|(i, (adjusted, sample))| {
            let defect_rate = match adjusted.value {
                Some(v) => {
                    let ratio = (v - reference.reference_value).abs() / reference.tolerance;
                    round_one_decimal(defect_rate_for_ratio(ratio))
                }
                None => 0.0,
            };

            ScoredPoint {
                index: i + 1,
                label: sample.label(i + 1),
                value: adjusted.value,
                is_outlier: adjusted.is_outlier,
                original_value: adjusted.original_value,
                defect_rate,
                reference_value: reference.reference_value,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleSeries {
    pub name: &'static str,
    pub column: &'static str,
    pub angle_index: usize,
    pub reference_value: f64,
    pub points: Vec<ScoredPoint>,
}

pub fn score_all_angles(window: &[Sample]) -> Vec<AngleSeries> {
    PHASE_ANGLES
        .iter()
        .map(|reference| AngleSeries {
            name: reference.name,
            column: reference.column,
            angle_index: reference.angle_index,
            reference_value: reference.reference_value,
            points: score_window(window, reference),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::fixtures::sample;

    fn window_of(values: &[Option<f64>]) -> Vec<Sample> {
        values
            .iter()
            .map(|&v| sample([v, None, None, None, None, None]))
            .collect()
    }

    #[test]
    fn test_concrete_deviation_scenario() {
        let assessment = assess(Some(55.0), &PHASE_ANGLES[0]);
        assert!((assessment.deviation - 2.92).abs() < 1e-9);
        assert!((assessment.deviation_ratio - 1.168).abs() < 1e-9);
        assert_eq!(assessment.status, AngleStatus::Warning);
        assert_eq!(assessment.severity, 3);
        assert_eq!(assessment.defect_rate, 8.4);
    }

    #[test]
    fn test_defect_rate_knots() {
        assert_eq!(defect_rate_for_ratio(0.0), 0.0);
        assert_eq!(defect_rate_for_ratio(0.5), 0.0);
        assert_eq!(defect_rate_for_ratio(1.0), 5.0);
        assert_eq!(defect_rate_for_ratio(2.0), 25.0);
        assert_eq!(defect_rate_for_ratio(4.0), 75.0);
        assert_eq!(defect_rate_for_ratio(8.0), 100.0);
        assert_eq!(defect_rate_for_ratio(50.0), 100.0);
        // first value past the 0.5 knot belongs to the linear branch
        assert!((defect_rate_for_ratio(0.5 + 1e-9) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_defect_rate_monotonic_and_bounded() {
        let mut previous = 0.0;
        for step in 0..=2000 {
            let ratio = step as f64 * 0.005;
            let rate = defect_rate_for_ratio(ratio);
            assert!((0.0..=100.0).contains(&rate), "ratio {ratio} gave {rate}");
            assert!(rate >= previous, "rate dropped at ratio {ratio}");
            previous = rate;
        }
    }

    #[test]
    fn test_status_thresholds() {
        let reference = &PHASE_ANGLES[4];
        let at = |offset: f64| assess(Some(reference.reference_value + offset), reference);

        assert_eq!(at(1.0).status, AngleStatus::Excellent);
        assert_eq!(at(-2.0).status, AngleStatus::Good);
        assert_eq!(at(4.0).status, AngleStatus::Warning);
        assert_eq!(at(-8.0).status, AngleStatus::Critical);
        assert_eq!(at(10.5).status, AngleStatus::Severe);
        assert!(!at(2.4).is_defect_predicted());
        assert!(at(2.6).is_defect_predicted());
    }

    #[test]
    fn test_missing_reading_is_unknown() {
        for value in [None, Some(f64::NAN), Some(f64::INFINITY)] {
            let assessment = assess(value, &PHASE_ANGLES[2]);
            assert_eq!(assessment.status, AngleStatus::Unknown);
            assert_eq!(assessment.severity, 0);
            assert_eq!(assessment.defect_rate, 0.0);
            assert!(!assessment.is_defect_predicted());
        }
    }

    #[test]
    fn test_outlier_is_clamped_to_fence() {
        let adjusted = adjust_outliers(&[52.0, 52.1, 52.2, 52.1, 80.0], 52.08);

        assert!(!adjusted[0].is_outlier);
        assert_eq!(adjusted[0].value, Some(52.0));

        let spike = adjusted[4];
        assert!(spike.is_outlier);
        assert_eq!(spike.original_value, Some(80.0));
        // Q3 (52.2) + 1.5 * IQR (0.1)
        assert!((spike.value.unwrap() - 52.35).abs() < 1e-9);
    }

    #[test]
    fn test_reference_anchor_tightens_fences() {
        // IQR fences alone would be [25, 225]
        let values = [60.0, 100.0, 140.0, 150.0];
        let bounds = OutlierBounds::compute(&values, 100.0).unwrap();
        assert_eq!(bounds.lower, 50.0);
        assert_eq!(bounds.upper, 150.0);

        let bounds = OutlierBounds::compute(&values, 80.0).unwrap();
        assert_eq!(bounds.upper, 120.0);
        let adjusted = adjust_outliers(&values, 80.0);
        assert_eq!(adjusted[3].value, Some(120.0));
        assert!(adjusted[3].is_outlier);
    }

    #[test]
    fn test_crossed_bounds_do_not_panic() {
        let adjusted = adjust_outliers(&[100.0, 100.0, 100.0, 100.0], 10.0);
        for a in adjusted {
            assert!(a.is_outlier);
            assert_eq!(a.value, Some(100.0));
        }
    }

    #[test]
    fn test_nan_is_excluded_and_reported_as_null() {
        let adjusted = adjust_outliers(&[52.0, f64::NAN, 52.2], 52.08);
        assert_eq!(adjusted[1].value, None);
        assert_eq!(adjusted[1].original_value, None);
        assert!(!adjusted[1].is_outlier);
        assert_eq!(adjusted[0].value, Some(52.0));
    }

    #[test]
    fn test_all_invalid_window() {
        let adjusted = adjust_outliers(&[f64::NAN, f64::NAN], 52.08);
        assert!(adjusted.iter().all(|a| a.value.is_none() && !a.is_outlier));
    }

    #[test]
    fn test_score_window_substitutes_missing_with_reference() {
        let window = window_of(&[Some(52.0), None, Some(f64::NAN), Some(52.2)]);
        let points = score_window(&window, &PHASE_ANGLES[0]);

        assert_eq!(points.len(), 4);
        assert_eq!(points[1].value, Some(52.08));
        assert_eq!(points[1].defect_rate, 0.0);
        assert_eq!(points[2].value, None);
        assert_eq!(points[2].defect_rate, 0.0);
        assert_eq!(points[3].index, 4);
        assert_eq!(points[3].label, "08:15:30");
    }

    #[test]
    fn test_score_window_rates_clamped_value() {
        let window = window_of(&[Some(55.0), Some(55.0), Some(55.0), Some(55.0)]);
        let points = score_window(&window, &PHASE_ANGLES[0]);
        assert!(points.iter().all(|p| !p.is_outlier));
        assert!(points.iter().all(|p| p.defect_rate == 8.4));
    }

    #[test]
    fn test_empty_window() {
        assert!(score_window(&[], &PHASE_ANGLES[0]).is_empty());
        assert!(score_all_angles(&[]).iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn test_scoring_is_repeatable() {
        let window = window_of(&[Some(52.0), Some(49.0), None, Some(70.0), Some(52.3)]);
        assert_eq!(
            score_window(&window, &PHASE_ANGLES[0]),
            score_window(&window, &PHASE_ANGLES[0])
        );
    }

    #[test]
    fn test_score_all_angles_layout() {
        let series = score_all_angles(&window_of(&[Some(52.08)]));
        assert_eq!(series.len(), 6);
        assert_eq!(series[2].column, "d082");
        assert_eq!(series[2].reference_value, -292.08);
        assert_eq!(series[5].points[0].value, Some(172.08));
    }
}
