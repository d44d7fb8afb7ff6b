use crate::issues::{IssueSeverity, StructuredIssue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const SURVEY_CONFIG_SCHEMA_0_0_1: &str = "odsurvey-config/0.0.1";
pub const DEFAULT_MAX_UPDATE_ITERATIONS: usize = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(default = "default_survey_schema")]
    pub schema: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub survey_start: Option<NaiveDate>,
    #[serde(default)]
    pub survey_end: Option<NaiveDate>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub segments: SegmentsConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            schema: default_survey_schema(),
            language: default_language(),
            survey_start: None,
            survey_end: None,
            engine: EngineConfig::default(),
            segments: SegmentsConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl SurveyConfig {
    /// Open bounds accept every date.
    pub fn survey_period_contains(&self, date: NaiveDate) -> bool {
        self.survey_start.map_or(true, |start| date >= start)
            && self.survey_end.map_or(true, |end| date <= end)
    }

    pub fn is_simple_mode(&self, mode: &str) -> bool {
        self.segments.simple_modes.iter().any(|simple| simple == mode)
    }

    pub fn is_loop_activity(&self, activity: &str) -> bool {
        self.segments
            .loop_activities
            .iter()
            .any(|candidate| candidate == activity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_update_iterations")]
    pub max_update_iterations: usize,
    /// Reaching the iteration cap fails the update instead of warning.
    #[serde(default)]
    pub strict_convergence: bool,
    /// `../` climbing above a widget path fails instead of clamping.
    #[serde(default)]
    pub strict_relative_paths: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_update_iterations: DEFAULT_MAX_UPDATE_ITERATIONS,
            strict_convergence: false,
            strict_relative_paths: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentsConfig {
    #[serde(default = "default_simple_modes")]
    pub simple_modes: Vec<String>,
    #[serde(default = "default_loop_activities")]
    pub loop_activities: Vec<String>,
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            simple_modes: default_simple_modes(),
            loop_activities: default_loop_activities(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurveyConfigError {
    #[error("read survey config failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("survey config parse failed: {0}")]
    Parse(String),
    #[error("survey config validation failed: {0:?}")]
    Validation(Vec<StructuredIssue>),
}

pub fn load_survey_config(path: &Path) -> Result<SurveyConfig, SurveyConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| SurveyConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env_placeholders(raw.as_str()).map_err(SurveyConfigError::Parse)?;
    let config: SurveyConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(expanded.as_str())
            .map_err(|error| SurveyConfigError::Parse(format!("json decode error: {error}")))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(expanded.as_str())
            .map_err(|error| SurveyConfigError::Parse(format!("yaml decode error: {error}")))?,
        _ => return parse_survey_config(expanded.as_str()),
    };
    finish(config)
}

/// Parses YAML or JSON text; `${VAR}` placeholders are not expanded here.
pub fn parse_survey_config(input: &str) -> Result<SurveyConfig, SurveyConfigError> {
    let config: SurveyConfig = serde_yaml::from_str(input)
        .or_else(|_| serde_json::from_str(input))
        .map_err(|error| SurveyConfigError::Parse(error.to_string()))?;
    finish(config)
}

fn finish(config: SurveyConfig) -> Result<SurveyConfig, SurveyConfigError> {
    let mut issues = validate_survey_config(&config);
    StructuredIssue::sort_stable(&mut issues);
    if !issues.is_empty() {
        return Err(SurveyConfigError::Validation(issues));
    }
    tracing::debug!(
        language = config.language.as_str(),
        max_update_iterations = config.engine.max_update_iterations,
        "survey config loaded"
    );
    Ok(config)
}

pub fn validate_survey_config(config: &SurveyConfig) -> Vec<StructuredIssue> {
    let mut issues = Vec::<StructuredIssue>::new();
    if config.schema != SURVEY_CONFIG_SCHEMA_0_0_1 {
        issues.push(config_issue(
            "survey.config.schema",
            "schema",
            format!(
                "unsupported survey config schema `{}` (expected `{SURVEY_CONFIG_SCHEMA_0_0_1}`)",
                config.schema
            ),
        ));
    }
    if config.language.trim().is_empty() {
        issues.push(config_issue(
            "survey.config.language",
            "language",
            "language must be non-empty".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (config.survey_start, config.survey_end) {
        if start > end {
            issues.push(config_issue(
                "survey.config.period",
                "survey_end",
                format!("survey_end {end} is before survey_start {start}"),
            ));
        }
    }
    if config.engine.max_update_iterations == 0 {
        issues.push(config_issue(
            "survey.config.engine.max_update_iterations",
            "engine.max_update_iterations",
            "max_update_iterations must be > 0".to_string(),
        ));
    }

    let loop_activities = config
        .segments
        .loop_activities
        .iter()
        .collect::<BTreeSet<_>>();
    let mut seen_modes = BTreeSet::new();
    for mode in &config.segments.simple_modes {
        if mode.trim().is_empty() {
            issues.push(config_issue(
                "survey.config.segments.simple_modes",
                "segments.simple_modes",
                "simple mode must be non-empty".to_string(),
            ));
        } else if !seen_modes.insert(mode) {
            issues.push(config_issue(
                "survey.config.segments.simple_modes.duplicate",
                "segments.simple_modes",
                format!("simple mode `{mode}` is listed twice"),
            ));
        }
    }
    if loop_activities.len() != config.segments.loop_activities.len() {
        issues.push(config_issue(
            "survey.config.segments.loop_activities.duplicate",
            "segments.loop_activities",
            "loop activities must be unique".to_string(),
        ));
    }

    issues
}

fn config_issue(reference: &str, path: &str, message: String) -> StructuredIssue {
    StructuredIssue::new("survey_config_error", IssueSeverity::Error, path, message)
        .with_reference(reference)
}

fn default_survey_schema() -> String {
    SURVEY_CONFIG_SCHEMA_0_0_1.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_update_iterations() -> usize {
    DEFAULT_MAX_UPDATE_ITERATIONS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_simple_modes() -> Vec<String> {
    [
        "walk",
        "bicycle",
        "carDriver",
        "carPassenger",
        "transitBus",
        "taxi",
        "motorcycle",
    ]
    .iter()
    .map(|mode| mode.to_string())
    .collect()
}

fn default_loop_activities() -> Vec<String> {
    ["workOnTheRoad", "leisureStroll"]
        .iter()
        .map(|activity| activity.to_string())
        .collect()
}

fn expand_env_placeholders(input: &str) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(start_offset) = input[cursor..].find("${") {
        let start = cursor + start_offset;
        out.push_str(&input[cursor..start]);
        let var_start = start + 2;
        let Some(end_offset) = input[var_start..].find('}') else {
            return Err("unterminated env placeholder `${...`".to_string());
        };
        let end = var_start + end_offset;
        let key = &input[var_start..end];
        if key.is_empty() {
            return Err("empty env placeholder `${}`".to_string());
        }
        let value = std::env::var(key)
            .map_err(|_| format!("missing env var for placeholder `${{{key}}}`"))?;
        out.push_str(value.as_str());
        cursor = end + 1;
    }
    out.push_str(&input[cursor..]);
    Ok(out)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
