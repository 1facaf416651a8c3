// Domain layer - Samples, scoring and alert rules
pub mod alert;
pub mod chart;
pub mod sample;
pub mod scoring;
