mod json;
mod yaml;

use crate::questionnaire::{Questionnaire, WidgetConfig, QUESTIONNAIRE_SCHEMA_0_0_1};
use odsurvey_core::{IssueSeverity, StructuredIssue};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Auto,
    Json,
    Yaml,
}

pub fn parse_questionnaire(input: &str) -> Result<Questionnaire, Vec<StructuredIssue>> {
    parse_questionnaire_with_format(input, DocumentFormat::Auto)
}

pub fn parse_questionnaire_with_format(
    input: &str,
    format: DocumentFormat,
) -> Result<Questionnaire, Vec<StructuredIssue>> {
    let value = match format {
        DocumentFormat::Auto => {
            if looks_like_json(input) {
                json::parse_json(input)
            } else {
                yaml::parse_yaml(input)
            }
        }
        DocumentFormat::Json => json::parse_json(input),
        DocumentFormat::Yaml => yaml::parse_yaml(input),
    }?;

    let schema_id = extract_schema_id(&value)?;
    if schema_id != QUESTIONNAIRE_SCHEMA_0_0_1 {
        return Err(vec![parse_issue(
            "schema",
            format!("unsupported questionnaire schema: {schema_id}"),
            "parse.unsupported_schema",
        )]);
    }

    let questionnaire = serde_json::from_value::<Questionnaire>(value).map_err(|err| {
        vec![parse_issue(
            "",
            format!("typed parse failed for schema {schema_id}: {err}"),
            "parse.typed_deserialize_error",
        )]
    })?;

    let mut issues = validate_questionnaire_references(&questionnaire);
    if issues.iter().any(StructuredIssue::is_error) {
        StructuredIssue::sort_stable(&mut issues);
        return Err(issues);
    }
    Ok(questionnaire)
}

/// Reports widget names used by sections or groups that are not defined,
/// section links to unknown sections, and widgets no section reaches.
pub fn validate_questionnaire_references(questionnaire: &Questionnaire) -> Vec<StructuredIssue> {
    let mut issues = Vec::<StructuredIssue>::new();
    let mut reachable = BTreeSet::<&str>::new();

    for (section_name, section) in &questionnaire.sections {
        for widget in &section.widgets {
            reachable.insert(widget.as_str());
            if !questionnaire.widgets.contains_key(widget) {
                issues.push(reference_issue(
                    format!("sections.{section_name}.widgets"),
                    format!("section `{section_name}` references undefined widget `{widget}`"),
                    "questionnaire.section.unknown_widget",
                ));
            }
        }
        for (field, link) in [
            ("previous_section", &section.previous_section),
            ("next_section", &section.next_section),
        ] {
            if let Some(link) = link {
                if !questionnaire.sections.contains_key(link) {
                    issues.push(reference_issue(
                        format!("sections.{section_name}.{field}"),
                        format!("section `{section_name}` links to unknown section `{link}`"),
                        "questionnaire.section.unknown_link",
                    ));
                }
            }
        }
    }

    for (widget_name, widget) in &questionnaire.widgets {
        let WidgetConfig::Group(group) = widget else {
            continue;
        };
        for child in &group.widgets {
            reachable.insert(child.as_str());
            if child == widget_name {
                issues.push(reference_issue(
                    format!("widgets.{widget_name}.widgets"),
                    format!("group `{widget_name}` contains itself"),
                    "questionnaire.group.self_reference",
                ));
            } else if !questionnaire.widgets.contains_key(child) {
                issues.push(reference_issue(
                    format!("widgets.{widget_name}.widgets"),
                    format!("group `{widget_name}` references undefined widget `{child}`"),
                    "questionnaire.group.unknown_widget",
                ));
            }
        }
    }

    for widget_name in questionnaire.widgets.keys() {
        if !reachable.contains(widget_name.as_str()) {
            issues.push(
                StructuredIssue::new(
                    "questionnaire_reference",
                    IssueSeverity::Warning,
                    format!("widgets.{widget_name}"),
                    format!("widget `{widget_name}` is not used by any section or group"),
                )
                .with_widget(widget_name.clone())
                .with_reference("questionnaire.widget.unused"),
            );
        }
    }

    StructuredIssue::sort_stable(&mut issues);
    issues
}

fn looks_like_json(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn extract_schema_id(value: &Value) -> Result<String, Vec<StructuredIssue>> {
    value
        .as_object()
        .and_then(|obj| obj.get("schema"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            vec![parse_issue(
                "",
                "document must contain string field `schema`".to_string(),
                "parse.schema_required",
            )]
        })
}

fn parse_issue(path: &str, message: String, reference: &str) -> StructuredIssue {
    StructuredIssue::new("parse_error", IssueSeverity::Error, path, message)
        .with_reference(reference)
}

fn reference_issue(path: String, message: String, reference: &str) -> StructuredIssue {
    StructuredIssue::new("questionnaire_reference", IssueSeverity::Error, path, message)
        .with_reference(reference)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
