// Historical phase-angle sample and batch models
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upstream quality verdict attached to every sample
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityStatus {
    Ok,
    Warning,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Sample timestamp as sent upstream: an ISO-8601 string or epoch seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleTime {
    Epoch(i64),
    Iso(String),
}

impl SampleTime {
    /// Parse as RFC 3339, naive ISO-8601, or epoch seconds in UTC
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        match self {
            SampleTime::Epoch(secs) => DateTime::from_timestamp(*secs, 0).map(|t| t.naive_utc()),
            SampleTime::Iso(text) => {
                if let Ok(t) = DateTime::parse_from_rfc3339(text) {
                    return Some(t.naive_local());
                }
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()
            }
        }
    }
}

impl From<&str> for SampleTime {
    fn from(text: &str) -> Self {
        SampleTime::Iso(text.to_string())
    }
}

/// One historical measurement as delivered by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: SampleTime,
    pub barcode: String,
    #[serde(default)]
    pub angle_1: Option<f64>,
    #[serde(default)]
    pub angle_2: Option<f64>,
    #[serde(default)]
    pub angle_3: Option<f64>,
    #[serde(default)]
    pub angle_4: Option<f64>,
    #[serde(default)]
    pub angle_5: Option<f64>,
    #[serde(default)]
    pub angle_6: Option<f64>,
    pub mean_value: f64,
    pub std_dev: f64,
    pub predicted_ppm: f64,
    #[serde(default)]
    pub ppm_slope: Option<f64>,
    #[serde(default)]
    pub quality_status: QualityStatus,
    #[serde(default)]
    pub defect_probability: f64,
}

impl Sample {
    /// Reading for angle slot 0..=5, `None` when absent or out of range
    pub fn angle(&self, index: usize) -> Option<f64> {
        match index {
            0 => self.angle_1,
            1 => self.angle_2,
            2 => self.angle_3,
            3 => self.angle_4,
            4 => self.angle_5,
            5 => self.angle_6,
            _ => None,
        }
    }

    pub fn time(&self) -> Option<NaiveDateTime> {
        self.timestamp.to_naive()
    }

    /// Chart label: wall-clock time, or `Point {index}` when the timestamp is unusable
    pub fn label(&self, index: usize) -> String {
        match self.time() {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => format!("Point {}", index),
        }
    }
}

/// Parameters for one historical batch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParameters {
    pub model_name: String,
    pub window_size: u32,
    pub z_threshold: f64,
    pub prediction_horizon: u32,
    pub max_records: u32,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            window_size: 50,
            z_threshold: 2.0,
            prediction_horizon: 10,
            max_records: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub total_data_points: u64,
    pub avg_ppm: f64,
    pub max_ppm: f64,
    pub min_ppm: f64,
    pub avg_slope: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingInfo {
    pub window_size: u32,
    pub z_threshold: f64,
    pub prediction_horizon: u32,
    pub phase_angles_monitored: u32,
    pub data_processing_rate: String,
}

/// A fetched, immutable, timestamp-ordered batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestBatch {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub processed_records: u64,
    pub phase_angle_data: Vec<Sample>,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
    #[serde(default)]
    pub processing_info: ProcessingInfo,
}

impl BacktestBatch {
    pub fn len(&self) -> usize {
        self.phase_angle_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phase_angle_data.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_records: self.total_records,
            performance_metrics: self.performance_metrics.clone(),
            processing_info: self.processing_info.clone(),
            ..BatchSummary::from_samples(&self.model_name, &self.phase_angle_data)
        }
    }
}

/// Quality distribution of a loaded batch, with the service-side metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub model_name: String,
    pub total_records: u64,
    pub processed_records: usize,
    pub status_counts: BTreeMap<QualityStatus, usize>,
    pub ok_count: usize,
    pub ng_count: usize,
    pub avg_defect_probability: f64,
    pub performance_metrics: PerformanceMetrics,
    pub processing_info: ProcessingInfo,
}

impl BatchSummary {
    pub fn from_samples(model_name: &str, samples: &[Sample]) -> Self {
        let mut status_counts = BTreeMap::new();
        for sample in samples {
            *status_counts.entry(sample.quality_status).or_insert(0) += 1;
        }

        let total = samples.len();
        let ok_count = status_counts.get(&QualityStatus::Ok).copied().unwrap_or(0);
        let avg_defect_probability = if total == 0 {
            0.0
        } else {
            samples.iter().map(|s| s.defect_probability).sum::<f64>() / total as f64
        };

        Self {
            model_name: model_name.to_string(),
            total_records: total as u64,
            processed_records: total,
            status_counts,
            ok_count,
            ng_count: total - ok_count,
            avg_defect_probability,
            performance_metrics: PerformanceMetrics::default(),
            processing_info: ProcessingInfo::default(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_deserialize_analysis_response() {
        let body = r#"{
            "model_name": "CAM-A",
            "total_records": 3,
            "processed_records": 1,
            "phase_angle_data": [{
                "timestamp": "2024-03-01T08:15:30",
                "barcode": "B1",
                "angle_1": 52.1,
                "angle_3": null,
                "mean_value": 1.0,
                "std_dev": 0.2,
                "predicted_ppm": 120.5,
                "quality_status": "WARNING",
                "defect_probability": 0.3
            }],
            "performance_metrics": {"avg_ppm": 120.5},
            "processing_info": {"window_size": 50}
        }"#;

        let batch: BacktestBatch = serde_json::from_str(body).unwrap();
        let sample = &batch.phase_angle_data[0];
        assert_eq!(sample.angle(0), Some(52.1));
        assert_eq!(sample.angle(2), None);
        assert_eq!(sample.angle(6), None);
        assert_eq!(sample.quality_status, QualityStatus::Warning);
        assert_eq!(batch.performance_metrics.avg_ppm, 120.5);
        assert_eq!(batch.processing_info.window_size, 50);
    }

    #[test]
    fn test_deserialize_epoch_timestamp() {
        let body = r#"{
            "phase_angle_data": [{
                "timestamp": 1709280930,
                "barcode": "B1",
                "angle_1": 52.1,
                "mean_value": 1.0,
                "std_dev": 0.2,
                "predicted_ppm": 120.5
            }]
        }"#;

        let batch: BacktestBatch = serde_json::from_str(body).unwrap();
        let sample = &batch.phase_angle_data[0];
        assert_eq!(sample.timestamp, SampleTime::Epoch(1_709_280_930));
        assert_eq!(sample.time().unwrap().to_string(), "2024-03-01 08:15:30");
        assert_eq!(
            serde_json::to_value(&sample.timestamp).unwrap(),
            serde_json::json!(1_709_280_930)
        );
    }

    #[test]
    fn test_unrecognised_status_is_unknown() {
        let status: QualityStatus = serde_json::from_str("\"DEGRADED\"").unwrap();
        assert_eq!(status, QualityStatus::Unknown);
    }

    #[test]
    fn test_label() {
        let mut s = nominal_sample();
        assert_eq!(s.label(1), "08:15:30");

        s.timestamp = "2024-03-01T08:15:30+09:00".into();
        assert_eq!(s.label(1), "08:15:30");

        s.timestamp = SampleTime::Epoch(1_709_280_930);
        assert_eq!(s.label(1), "08:15:30");

        s.timestamp = "garbage".into();
        assert_eq!(s.label(7), "Point 7");
    }

    #[test]
    fn test_summary_counts_non_ok_as_ng() {
        let mut warning = nominal_sample();
        warning.quality_status = QualityStatus::Warning;
        warning.defect_probability = 0.5;
        let mut unknown = nominal_sample();
        unknown.quality_status = QualityStatus::Unknown;
        unknown.defect_probability = 0.1;

        let summary = batch(vec![nominal_sample(), warning, unknown]).summary();
        assert_eq!(summary.processed_records, 3);
        assert_eq!(summary.ok_count, 1);
        assert_eq!(summary.ng_count, 2);
        assert_eq!(summary.status_counts.get(&QualityStatus::Warning), Some(&1));
        assert!((summary.avg_defect_probability - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_summary_carries_service_metrics() {
        let mut b = batch(vec![nominal_sample(); 2]);
        b.total_records = 40;
        b.performance_metrics.avg_ppm = 120.5;
        b.performance_metrics.total_data_points = 2;
        b.processing_info.data_processing_rate = "2/40".to_string();

        let summary = b.summary();
        assert_eq!(summary.total_records, 40);
        assert_eq!(summary.processed_records, 2);
        assert_eq!(summary.performance_metrics.avg_ppm, 120.5);
        assert_eq!(summary.performance_metrics.total_data_points, 2);
        assert_eq!(summary.processing_info.data_processing_rate, "2/40");
    }
}
