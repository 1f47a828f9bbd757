//! Typed access to unit configuration maps.

use serde_json::Value;

use super::UnitConfiguration;
use crate::error::{AdviserError, Result};

/// Validates a unit configuration against the keys the unit knows about
pub(crate) struct ConfigReader<'a> {
    unit: &'static str,
    configuration: &'a UnitConfiguration,
}

impl<'a> ConfigReader<'a> {
    /// Fails on any key outside `known`
    pub fn new(unit: &'static str, configuration: &'a UnitConfiguration, known: &[&str]) -> Result<Self> {
        if let Some(key) = configuration.keys().find(|key| !known.contains(&key.as_str())) {
            return Err(AdviserError::UnitConfiguration {
                unit: unit.to_string(),
                message: format!("unknown configuration key '{}'", key),
            });
        }
        Ok(Self { unit, configuration })
    }

    fn invalid(&self, key: &str, expected: &str, value: &Value) -> AdviserError {
        AdviserError::UnitConfiguration {
            unit: self.unit.to_string(),
            message: format!("'{}' must be {}, got {}", key, expected, value),
        }
    }

    fn value(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key).filter(|value| !value.is_null())
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.value(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| self.invalid(key, "a finite number", value)),
        }
    }

    pub fn required_f64(&self, key: &str) -> Result<f64> {
        match self.value(key) {
            None => Err(AdviserError::UnitConfiguration {
                unit: self.unit.to_string(),
                message: format!("missing required key '{}'", key),
            }),
            Some(_) => self.f64_or(key, 0.0),
        }
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.value(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| self.invalid(key, "a non-negative integer", value)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.value(key) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| self.invalid(key, "a boolean", value)),
        }
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<String>> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(value) => Err(self.invalid(key, "a string", value)),
        }
    }
}
