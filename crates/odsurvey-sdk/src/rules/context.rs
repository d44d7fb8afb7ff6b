use crate::rules::registry::RuleError;
use odsurvey_core::{
    interpolate_path, resolve_path, try_resolve_path, InterviewDocument, SurveyConfig,
};
use serde_json::Value;

/// What a rule sees: the document, the widget's response path and the
/// survey configuration.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub document: &'a InterviewDocument,
    pub path: &'a str,
    /// Free-text companion answer (an "other, specify" field), if any.
    pub custom_path: Option<&'a str>,
    pub config: &'a SurveyConfig,
}

impl<'a> RuleContext<'a> {
    pub fn new(document: &'a InterviewDocument, path: &'a str, config: &'a SurveyConfig) -> Self {
        Self {
            document,
            path,
            custom_path: None,
            config,
        }
    }

    pub fn with_custom_path(mut self, custom_path: Option<&'a str>) -> Self {
        self.custom_path = custom_path;
        self
    }

    /// The widget's own stored value.
    pub fn value(&self) -> Option<&'a Value> {
        self.document.response(self.path)
    }

    pub fn custom_value(&self) -> Option<&'a Value> {
        self.custom_path
            .and_then(|custom_path| self.document.response(custom_path))
    }

    pub fn responses(&self) -> &'a Value {
        self.document.responses()
    }

    /// Resolves `relative` against the widget path and interpolates
    /// placeholders. `None` when the resolution is empty.
    pub fn resolve(&self, relative: Option<&str>) -> Result<Option<String>, RuleError> {
        let resolved = if self.config.engine.strict_relative_paths {
            try_resolve_path(self.path, relative).map_err(|source| RuleError::Path {
                path: self.path.to_string(),
                source,
            })?
        } else {
            resolve_path(Some(self.path), relative)
        };
        Ok(resolved.map(|path| interpolate_path(&path, self.responses())))
    }

    pub fn lookup(&self, relative: Option<&str>) -> Result<Option<&'a Value>, RuleError> {
        Ok(self
            .resolve(relative)?
            .and_then(|path| self.document.response(&path)))
    }
}
