use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredIssue {
    pub kind: String,
    pub severity: IssueSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<Value>,
}

impl StructuredIssue {
    pub fn new(
        kind: impl Into<String>,
        severity: IssueSeverity,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            severity,
            widget: None,
            path: path.into(),
            message: message.into(),
            reference: None,
            related: None,
        }
    }

    pub fn with_widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(widget.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_related(mut self, related: Value) -> Self {
        self.related = Some(related);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }

    pub fn sort_stable(issues: &mut [Self]) {
        issues.sort_by(|left, right| {
            (
                left.severity,
                &left.kind,
                &left.path,
                &left.message,
                &left.widget,
            )
                .cmp(&(
                    right.severity,
                    &right.kind,
                    &right.path,
                    &right.message,
                    &right.widget,
                ))
        });
    }
}

#[cfg(test)]
#[path = "issues_test.rs"]
mod tests;
