//! Settings for a solve, passed explicitly to every component that needs them
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default endpoint for the LLM interpreter (OpenAI compatible chat completions)
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Top level configuration of a scenario solve
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Configuration {
    /// Settings passed to the MILP solver
    pub solver: SolverSettings,
    /// Settings of the LLM interpreter tier
    pub llm: LlmConfig,
    /// Objective weight applied to each priority term
    pub priority_weight: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            solver: SolverSettings::default(),
            llm: LlmConfig::default(),
            priority_weight: 10.0,
        }
    }
}

/// Limits and backend selection for the MILP solver
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct SolverSettings {
    /// Wall clock limit for a single solve
    #[serde(with = "seconds")]
    pub time_limit: Duration,
    /// Relative optimality gap at which the solver may stop
    pub mip_gap: f64,
    /// Which backend to use
    pub backend: SolverBackend,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            time_limit: Duration::from_secs(60),
            mip_gap: 1e-4,
            backend: SolverBackend::default(),
        }
    }
}

/// Enum used to specify the MILP solver
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Pure Rust branch and bound solver, always available
    #[default]
    Microlp,
    /// The HiGHS solver, requires the highs feature to be enabled
    Highs,
}

impl std::str::FromStr for SolverBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" => Ok(SolverBackend::Microlp),
            "highs" => Ok(SolverBackend::Highs),
            other => Err(format!("unknown solver backend: {}", other)),
        }
    }
}

/// Settings for the LLM interpreter
///
/// Without an `api_key` the interpreter tier is reported as unavailable.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct LlmConfig {
    #[builder(setter(into, strip_option))]
    pub api_key: Option<String>,
    #[builder(setter(into))]
    pub endpoint: String,
    #[builder(setter(into))]
    pub model: String,
    /// Request level timeout, covering connect and response
    #[serde(with = "seconds")]
    pub timeout: Duration,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            api_key: None,
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(20),
            temperature: 0.1,
        }
    }
}

impl LlmConfig {
    /// Whether a credential is present
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Durations are written as (fractional) seconds
mod seconds {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.solver.time_limit, Duration::from_secs(60));
        assert_eq!(config.solver.backend, SolverBackend::Microlp);
        assert!((config.priority_weight - 10.0).abs() < 1e-12);
        assert!(!config.llm.is_configured());
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn builder() {
        let config = ConfigurationBuilder::default()
            .llm(LlmConfigBuilder::default().api_key("key").build().unwrap())
            .priority_weight(2.5)
            .build()
            .unwrap();
        assert!(config.llm.is_configured());
        assert_eq!(config.llm.endpoint, DEFAULT_LLM_ENDPOINT);
        assert!((config.priority_weight - 2.5).abs() < 1e-12);
    }

    #[test]
    fn deserialize_partial() {
        let config: Configuration = serde_json::from_str(
            r#"{"solver": {"time_limit": 2.5, "backend": "highs"}, "llm": {"api_key": "  "}}"#,
        )
        .unwrap();
        assert_eq!(config.solver.time_limit, Duration::from_millis(2500));
        assert_eq!(config.solver.backend, SolverBackend::Highs);
        assert!((config.solver.mip_gap - 1e-4).abs() < 1e-12);
        // Blank keys count as missing
        assert!(!config.llm.is_configured());
    }

    #[test]
    fn backend_from_str() {
        assert_eq!("HiGHS".parse::<SolverBackend>(), Ok(SolverBackend::Highs));
        assert!("cplex".parse::<SolverBackend>().is_err());
    }
}
