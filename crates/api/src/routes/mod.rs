//! HTTP Routes

pub mod dashboard;
pub mod data;
pub mod health;
