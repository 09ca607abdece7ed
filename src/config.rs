use std::net::SocketAddr;

use crate::analysis::AnalysisConfig;
use crate::error::{InsightsError, Result};
use crate::pipeline::LegacyConfig;
use crate::store::StoreConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0:5001";

/// Everything the service needs, gathered from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub analysis: AnalysisConfig,
    pub legacy: LegacyConfig,
    pub bind: SocketAddr,
}

impl AppConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let bind = std::env::var("INSIGHTS_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        Ok(Self {
            store: StoreConfig::from_env(),
            analysis: AnalysisConfig::from_env()?,
            legacy: LegacyConfig::from_env(),
            bind: parse_bind(&bind)?,
        })
    }
}

pub fn parse_bind(addr: &str) -> Result<SocketAddr> {
    addr.trim()
        .parse()
        .map_err(|e| InsightsError::Config(format!("invalid bind address {:?}: {}", addr, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind() {
        assert_eq!(parse_bind(DEFAULT_BIND).unwrap().port(), 5001);
        assert!(matches!(parse_bind("localhost"), Err(InsightsError::Config(_))));
    }
}
