use crate::rules::{ChoiceConfig, ConditionalRule, ValidationRule, ValueRule};
use odsurvey_core::{interpolate_path, placeholder_paths, sorted_members, InterviewDocument};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const QUESTIONNAIRE_SCHEMA_0_0_1: &str = "odsurvey-questionnaire/0.0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub schema: String,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionConfig>,
    #[serde(default)]
    pub widgets: BTreeMap<String, WidgetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub widgets: Vec<String>,
    #[serde(default)]
    pub previous_section: Option<String>,
    #[serde(default)]
    pub next_section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetConfig {
    Question(QuestionWidget),
    Group(GroupWidget),
    Text(TextWidget),
}

impl WidgetConfig {
    pub fn conditional(&self) -> Option<&ConditionalRule> {
        match self {
            WidgetConfig::Question(widget) => widget.conditional.as_ref(),
            WidgetConfig::Group(widget) => widget.conditional.as_ref(),
            WidgetConfig::Text(widget) => widget.conditional.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionWidget {
    pub path: String,
    /// Companion free-text answer, resolved like `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ValueRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Repeats `widgets` once per member of the grouped collection at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupWidget {
    pub path: String,
    pub widgets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWidget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
}

/// One concrete occurrence of a widget in a section.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetInstance<'q> {
    pub name: &'q str,
    /// Response path (relative to `responses`), placeholders interpolated.
    pub path: String,
    pub widget: &'q WidgetConfig,
    pub custom_path: Option<String>,
    /// Member path of the enclosing group, if any.
    pub group_path: Option<String>,
    /// Response paths read by placeholders in this widget's paths and in the
    /// paths of its enclosing groups.
    pub placeholder_sources: Vec<String>,
}

impl Questionnaire {
    pub fn section(&self, name: &str) -> Option<&SectionConfig> {
        self.sections.get(name)
    }

    /// Expands a section into widget instances in declaration order; group
    /// children follow their group, member by member in `sequence` order.
    pub fn section_instances(
        &self,
        section: &SectionConfig,
        document: &InterviewDocument,
    ) -> Vec<WidgetInstance<'_>> {
        let mut instances = Vec::new();
        for name in &section.widgets {
            self.push_instances(name, None, &[], document, &mut instances);
        }
        instances
    }

    fn push_instances<'q>(
        &'q self,
        name: &str,
        member_path: Option<&str>,
        inherited_sources: &[String],
        document: &InterviewDocument,
        instances: &mut Vec<WidgetInstance<'q>>,
    ) {
        let Some((name, widget)) = self.widgets.get_key_value(name) else {
            tracing::debug!(widget = name, "section references an undefined widget, skipping");
            return;
        };
        let responses = document.responses();
        let join = |relative: &str| match member_path {
            Some(member) => format!("{member}.{}", interpolate_path(relative, responses)),
            None => interpolate_path(relative, responses),
        };
        let sources = |relatives: &[Option<&str>]| {
            let mut sources = inherited_sources.to_vec();
            for relative in relatives.iter().flatten() {
                sources.extend(placeholder_paths(relative));
            }
            sources
        };

        match widget {
            WidgetConfig::Question(question) => instances.push(WidgetInstance {
                name,
                path: join(&question.path),
                custom_path: question.custom_path.as_deref().map(join),
                widget,
                group_path: member_path.map(str::to_string),
                placeholder_sources: sources(&[
                    Some(question.path.as_str()),
                    question.custom_path.as_deref(),
                ]),
            }),
            WidgetConfig::Text(text) => instances.push(WidgetInstance {
                name,
                path: text
                    .path
                    .as_deref()
                    .map(join)
                    .or_else(|| member_path.map(str::to_string))
                    .unwrap_or_else(|| name.clone()),
                custom_path: None,
                widget,
                group_path: member_path.map(str::to_string),
                placeholder_sources: sources(&[text.path.as_deref()]),
            }),
            WidgetConfig::Group(group) => {
                let group_path = join(&group.path);
                let group_sources = sources(&[Some(group.path.as_str())]);
                instances.push(WidgetInstance {
                    name,
                    path: group_path.clone(),
                    custom_path: None,
                    widget,
                    group_path: member_path.map(str::to_string),
                    placeholder_sources: group_sources.clone(),
                });
                for member in sorted_members(document.response(&group_path)) {
                    let member_path = format!("{group_path}.{}", member.uuid);
                    for child in &group.widgets {
                        self.push_instances(
                            child,
                            Some(&member_path),
                            &group_sources,
                            document,
                            instances,
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
