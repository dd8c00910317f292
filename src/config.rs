use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AnalyticsError;

/// How RATING and DATE answers that fail to parse are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Exclude the answer and count it as invalid.
    #[default]
    Lenient,
    /// Fail the whole question analysis.
    Strict,
}

impl FromStr for ParsePolicy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ParsePolicy::Lenient),
            "strict" => Ok(ParsePolicy::Strict),
            other => Err(AnalyticsError::Validation(format!(
                "unknown parse policy '{other}' (expected lenient or strict)"
            ))),
        }
    }
}

/// Identity given to responses without a respondent in trend completion math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymousPolicy {
    /// All anonymous responses share the literal `anonymous` respondent.
    #[default]
    Shared,
    /// Each anonymous response is its own respondent (`anonymous:<response id>`).
    PerResponse,
}

impl FromStr for AnonymousPolicy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(AnonymousPolicy::Shared),
            "per-response" | "per_response" => Ok(AnonymousPolicy::PerResponse),
            other => Err(AnalyticsError::Validation(format!(
                "unknown anonymous policy '{other}' (expected shared or per-response)"
            ))),
        }
    }
}

/// Runtime settings for the analytics service.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Directory export artifacts are written under
    pub export_root: PathBuf,
    pub parse_policy: ParsePolicy,
    pub anonymous_policy: AnonymousPolicy,
    /// Delete the previous snapshot's artifacts once a new snapshot is stored
    pub prune_stale_exports: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            export_root: PathBuf::from("exports"),
            parse_policy: ParsePolicy::default(),
            anonymous_policy: AnonymousPolicy::default(),
            prune_stale_exports: true,
        }
    }
}

impl AnalyticsConfig {
    /// Builds a config from `EXPORT_ROOT`, `PARSE_POLICY`, `ANONYMOUS_POLICY`
    /// and `PRUNE_STALE_EXPORTS`, falling back to defaults for unset variables.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("EXPORT_ROOT") {
            config.export_root = PathBuf::from(root);
        }
        if let Ok(policy) = std::env::var("PARSE_POLICY") {
            config.parse_policy = policy.parse()?;
        }
        if let Ok(policy) = std::env::var("ANONYMOUS_POLICY") {
            config.anonymous_policy = policy.parse()?;
        }
        if let Ok(flag) = std::env::var("PRUNE_STALE_EXPORTS") {
            config.prune_stale_exports = parse_flag(&flag)?;
        }

        Ok(config)
    }

    pub fn with_export_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.export_root = root.into();
        self
    }
}

fn parse_flag(value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AnalyticsError::Validation(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}
