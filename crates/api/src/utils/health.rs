//! Health reporting for `GET /health`
//!
//! A status is a list of component checks plus a score (healthy / total).
//! The gateway is healthy at or above [`HEALTHY_THRESHOLD`].

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Fraction of healthy components required for an overall healthy status.
pub const HEALTHY_THRESHOLD: f64 = 0.8;

/// Overall health status of the gateway
///
/// # Example
/// ```no_run
/// use relaygate_api::utils::health::{ComponentHealth, HealthStatus};
///
/// let mut status = HealthStatus::new()
///     .add_component(ComponentHealth::healthy("database"))
///     .add_component(ComponentHealth::unhealthy("providers", "no provider is configured"));
/// status.calculate_score();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.is_healthy);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// From 0.0 (nothing healthy) to 1.0 (everything healthy).
    pub score: f64,

    pub version: String,

    pub components: Vec<ComponentHealth>,

    /// Unix seconds when the check ran.
    pub timestamp: i64,
}

impl HealthStatus {
    /// Healthy, score 1.0, no components.
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            version: env!("CARGO_PKG_VERSION").to_string(),
            components: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Recompute `score` and `is_healthy` from the components.
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let healthy_count = self.components.iter().filter(|c| c.is_healthy).count();

        self.score = healthy_count as f64 / self.components.len() as f64;
        self.is_healthy = self.score >= HEALTHY_THRESHOLD;
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Health of one component (`database`, `providers`, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub is_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_new() {
        let status = HealthStatus::new();
        assert!(status.is_healthy);
        assert_eq!(status.score, 1.0);
        assert!(status.components.is_empty());
        assert!(status.timestamp > 0);
    }

    #[test]
    fn test_calculate_score_all_healthy() {
        let mut status = HealthStatus::new()
            .add_component(ComponentHealth::healthy("database"))
            .add_component(ComponentHealth::healthy("providers").with_message("linear"));

        status.calculate_score();

        assert_eq!(status.score, 1.0);
        assert!(status.is_healthy);
    }

    #[test]
    fn test_calculate_score_half_healthy() {
        let mut status = HealthStatus::new()
            .add_component(ComponentHealth::healthy("database"))
            .add_component(ComponentHealth::unhealthy("providers", "none configured"));

        status.calculate_score();

        assert_eq!(status.score, 0.5);
        assert!(!status.is_healthy);
    }

    #[test]
    fn test_serializes_camel_case_without_empty_message() {
        let json = serde_json::to_value(
            HealthStatus::new().add_component(ComponentHealth::healthy("database")),
        )
        .expect("serialize");

        assert_eq!(json["isHealthy"], true);
        assert_eq!(json["components"][0]["isHealthy"], true);
        assert!(json["components"][0].get("message").is_none());
    }
}
