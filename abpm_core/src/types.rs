//! Core domain types for the ABPM tools.
//!
//! This module defines:
//! - The patient measurement consumed by the hemodynamic pipeline
//! - The raw ABPM test record as delivered by the clinical API
//! - Readings and test metadata inside that record

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Ejection fraction assumed when the test does not report one
pub const DEFAULT_EJECTION_FRACTION: f64 = 0.65;

fn default_ejection_fraction() -> f64 {
    DEFAULT_EJECTION_FRACTION
}

// ============================================================================
// Patient Measurement
// ============================================================================

/// One set of patient inputs for the hemodynamic pipeline.
///
/// Units: age in years, weight in kg, height in meters, pressures in mmHg,
/// heart rate in beats per minute, ejection fraction as a fraction.
///
/// The pipeline does not check these values. Callers that build
/// measurements from untrusted data should run [`PatientMeasurement::validate`]
/// first.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientMeasurement {
    pub age: f64,
    pub weight: f64,
    pub height: f64,
    pub systolic_blood_pressure: f64,
    pub diastolic_blood_pressure: f64,
    pub heart_rate: f64,
    #[serde(default = "default_ejection_fraction")]
    pub left_ventricular_ejection_fraction: f64,
}

impl PatientMeasurement {
    pub fn new(
        age: f64,
        weight: f64,
        height: f64,
        systolic_blood_pressure: f64,
        diastolic_blood_pressure: f64,
        heart_rate: f64,
    ) -> Self {
        Self {
            age,
            weight,
            height,
            systolic_blood_pressure,
            diastolic_blood_pressure,
            heart_rate,
            left_ventricular_ejection_fraction: DEFAULT_EJECTION_FRACTION,
        }
    }

    pub fn with_ejection_fraction(mut self, fraction: f64) -> Self {
        self.left_ventricular_ejection_fraction = fraction;
        self
    }

    /// Check the documented preconditions, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("age", self.age),
            ("weight", self.weight),
            ("height", self.height),
            ("diastolic_blood_pressure", self.diastolic_blood_pressure),
            ("heart_rate", self.heart_rate),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidMeasurement(format!(
                    "{} must be a positive number, got {}",
                    field, value
                )));
            }
        }

        if !self.systolic_blood_pressure.is_finite()
            || self.systolic_blood_pressure <= self.diastolic_blood_pressure
        {
            return Err(Error::InvalidMeasurement(format!(
                "systolic ({}) must be greater than diastolic ({})",
                self.systolic_blood_pressure, self.diastolic_blood_pressure
            )));
        }

        let ef = self.left_ventricular_ejection_fraction;
        if !(ef > 0.0 && ef <= 1.0) {
            return Err(Error::InvalidMeasurement(format!(
                "ejection fraction must be in (0, 1], got {}",
                ef
            )));
        }

        Ok(())
    }
}

// ============================================================================
// API Record Types
// ============================================================================

/// One ABPM test as pulled from the clinical API and stored on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbpmRecord {
    pub id: u64,
    #[serde(default)]
    pub data: Vec<Reading>,
    #[serde(default)]
    pub meta_data: Vec<TestMetadata>,
    #[serde(default)]
    pub measure: Value,
    #[serde(default)]
    pub drugs: Value,
}

impl AbpmRecord {
    /// Whether the test carries any readings
    pub fn has_readings(&self) -> bool {
        !self.data.is_empty()
    }

    /// Metadata for the test (the API returns a one-element list)
    pub fn metadata(&self) -> Option<&TestMetadata> {
        self.meta_data.first()
    }
}

/// A single timestamped reading (`tabla_mediciones` endpoint)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "fecha_dt", default, deserialize_with = "lenient_string")]
    pub taken_at: Option<String>,
    #[serde(rename = "sistolica", default, deserialize_with = "lenient_f64")]
    pub systolic: Option<f64>,
    #[serde(rename = "diastolica", default, deserialize_with = "lenient_f64")]
    pub diastolic: Option<f64>,
    /// Heart rate
    #[serde(rename = "valor", default, deserialize_with = "lenient_f64")]
    pub heart_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Test metadata (`get_mapa` endpoint)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TestMetadata {
    #[serde(rename = "fecha_nacimiento", default, deserialize_with = "lenient_string")]
    pub birth_date: Option<String>,
    #[serde(rename = "fecha_inicio", default, deserialize_with = "lenient_string")]
    pub start_date: Option<String>,
    #[serde(rename = "inicio_noche", default, deserialize_with = "lenient_string")]
    pub start_night: Option<String>,
    #[serde(rename = "fin_noche", default, deserialize_with = "lenient_string")]
    pub end_night: Option<String>,
    #[serde(rename = "genero", default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(rename = "talla", default, deserialize_with = "lenient_f64")]
    pub height: Option<f64>,
    #[serde(rename = "peso", default, deserialize_with = "lenient_f64")]
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Accept numbers sent either as JSON numbers or numeric strings.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    })
}

/// Accept strings, and stringify scalars the API sometimes sends bare.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
