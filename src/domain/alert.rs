// Defect alerts and edge-triggered detection
use super::sample::{Sample, SampleTime};
use super::scoring::{AngleAssessment, AngleReference, PHASE_ANGLES, assess};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Warning,
    #[serde(rename = "HIGH RISK")]
    HighRisk,
    Critical,
}

impl AlertSeverity {
    pub fn classify(assessment: &AngleAssessment) -> Self {
        if assessment.severity >= 5 || assessment.defect_rate > 50.0 {
            AlertSeverity::Critical
        } else if assessment.severity >= 4 || assessment.defect_rate > 25.0 {
            AlertSeverity::HighRisk
        } else {
            AlertSeverity::Warning
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::HighRisk => "HIGH RISK",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    fn action(self) -> &'static str {
        match self {
            AlertSeverity::Warning => "increase monitoring",
            AlertSeverity::HighRisk => "inspection recommended",
            AlertSeverity::Critical => "immediate action required",
        }
    }
}

/// One transition of an angle into the predicted-defect state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub id: u64,
    pub model_name: String,
    pub angle_name: &'static str,
    pub column: &'static str,
    pub severity: AlertSeverity,
    pub defect_rate: f64,
    pub reference_value: f64,
    pub deviation: f64,
    pub cursor: usize,
    pub barcode: String,
    pub timestamp: SampleTime,
}

impl AlertEvent {
    pub fn message(&self) -> String {
        format!(
            "{} | {} ({}) defect rate {:.1}% | {} | reference {} deviation ±{:.3} | {}",
            self.model_name,
            self.angle_name,
            self.column,
            self.defect_rate,
            self.severity.label(),
            self.reference_value,
            self.deviation,
            self.severity.action(),
        )
    }
}

/// Remembers which `model + column` keys are already in the defect state so
/// only the transition into it raises an alert. Alert ids are scoped to the
/// detector and strictly increasing.
#[derive(Debug, Default)]
pub struct DefectEdgeDetector {
    previous: HashMap<String, bool>,
    next_id: u64,
}

impl DefectEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }

    /// Angles with a missing reading keep their previous flag.
    pub fn observe(&mut self, model_name: &str, cursor: usize, sample: &Sample) -> Vec<AlertEvent> {
        let mut alerts = Vec::new();

        for reference in PHASE_ANGLES.iter() {
            let Some(value) = sample.angle(reference.angle_index) else {
                continue;
            };

            let assessment = assess(Some(value), reference);
            let predicted = assessment.is_defect_predicted();
            let key = format!("{}_{}", model_name, reference.column);
            let was_predicted = self.previous.insert(key, predicted).unwrap_or(false);

            if predicted && !was_predicted {
                alerts.push(self.alert(model_name, cursor, sample, reference, &assessment));
            }
        }

        alerts
    }

    fn alert(
        &mut self,
        model_name: &str,
        cursor: usize,
        sample: &Sample,
        reference: &AngleReference,
        assessment: &AngleAssessment,
    ) -> AlertEvent {
        self.next_id += 1;
        AlertEvent {
            id: self.next_id,
            model_name: model_name.to_string(),
            angle_name: reference.name,
            column: reference.column,
            severity: AlertSeverity::classify(assessment),
            defect_rate: assessment.defect_rate,
            reference_value: reference.reference_value,
            deviation: assessment.deviation,
            cursor,
            barcode: sample.barcode.clone(),
            timestamp: sample.timestamp.clone(),
        }
    }
}
