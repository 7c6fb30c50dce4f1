//! Reading Records

use chrono::{DateTime, Utc};

/// A persisted sensor sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub gas_level: i64,
    pub timestamp: DateTime<Utc>,
}

/// Values supplied by a sensor node. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewReading {
    pub temperature: f64,
    pub humidity: f64,
    pub gas_level: i64,
}

impl NewReading {
    pub fn new(temperature: f64, humidity: f64, gas_level: i64) -> Self {
        Self {
            temperature,
            humidity,
            gas_level,
        }
    }
}
