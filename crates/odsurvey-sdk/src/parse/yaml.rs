use odsurvey_core::{IssueSeverity, StructuredIssue};
use serde_json::Value;

pub fn parse_yaml(input: &str) -> Result<Value, Vec<StructuredIssue>> {
    let yaml_value: serde_yaml::Value = serde_yaml::from_str(input).map_err(|err| {
        let message = err.to_string();
        let reference = if message.to_ascii_lowercase().contains("duplicate") {
            "yaml.duplicate_key"
        } else {
            "yaml.parse_error"
        };
        vec![StructuredIssue::new(
            "parse_error",
            IssueSeverity::Error,
            "",
            format!("yaml parse failed: {message}"),
        )
        .with_reference(reference)]
    })?;

    serde_json::to_value(yaml_value).map_err(|err| {
        vec![StructuredIssue::new(
            "parse_error",
            IssueSeverity::Error,
            "",
            format!("yaml-to-json conversion failed: {err}"),
        )
        .with_reference("yaml.to_json_error")]
    })
}
