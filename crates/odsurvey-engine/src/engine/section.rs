use crate::engine::AffectedPaths;
use odsurvey_core::{
    apply_changeset, build_changeset_guard_policy, response_path, validation_path, Changeset,
    ChangesetGuardPolicy, ChangesetRejection, InterviewDocument, IssueSeverity,
    ResponsePathError, StructuredIssue, SurveyConfig,
};
use odsurvey_sdk::{
    collect_rule_dependencies, describe_widget, evaluate_conditional, evaluate_widget,
    Questionnaire, RuleContext, RuleError, RuleRegistry, WidgetConfig, WidgetDescription,
    WidgetInstance,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Everything an update needs besides the document itself.
#[derive(Debug, Clone)]
pub struct UpdateContext<'a> {
    pub questionnaire: &'a Questionnaire,
    pub registry: &'a RuleRegistry,
    pub config: &'a SurveyConfig,
    pub guard_policy: ChangesetGuardPolicy,
}

impl<'a> UpdateContext<'a> {
    pub fn new(
        questionnaire: &'a Questionnaire,
        registry: &'a RuleRegistry,
        config: &'a SurveyConfig,
    ) -> Self {
        Self {
            questionnaire,
            registry,
            config,
            guard_policy: build_changeset_guard_policy(),
        }
    }

    pub fn with_guard_policy(mut self, guard_policy: ChangesetGuardPolicy) -> Self {
        self.guard_policy = guard_policy;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateSectionError {
    #[error("unknown section `{0}`")]
    UnknownSection(String),
    #[error("section `{section}` did not converge after {iterations} iterations")]
    DidNotConverge {
        section: String,
        iterations: usize,
        pending_paths: Vec<String>,
    },
    #[error("widget `{widget}` at `{path}`: {source}")]
    Rule {
        widget: String,
        path: String,
        #[source]
        source: RuleError,
    },
    #[error("cannot write `{path}`: {source}")]
    Write {
        path: String,
        #[source]
        source: ResponsePathError,
    },
}

/// Latest evaluation of one question instance.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetStatus {
    pub widget: String,
    pub path: String,
    pub custom_path: Option<String>,
    pub group_path: Option<String>,
    pub visible: bool,
    pub valid: bool,
    pub value: Option<Value>,
    pub custom_value: Option<Value>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionUpdate {
    pub document: InterviewDocument,
    /// Accepted proposals plus every correction and validation write.
    pub applied: Changeset,
    /// Widgets evaluated during the update, in declaration order.
    pub statuses: Vec<WidgetStatus>,
    pub iterations: usize,
    pub converged: bool,
    pub all_widgets_valid: bool,
    pub issues: Vec<StructuredIssue>,
}

/// Display-time view of one widget instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribedWidget {
    pub widget: String,
    pub path: String,
    pub group_path: Option<String>,
    pub visible: bool,
    /// Only questions carry choices, defaults and validation messages.
    pub question: Option<WidgetDescription>,
}

/// Applies `proposed` to `document`, then re-evaluates the questions of
/// `section_name` until no widget requests a further correction or the
/// configured iteration cap is reached.
///
/// Only questions whose dependencies overlap the changed paths are
/// evaluated. Corrections are applied as soon as they are produced, so
/// later widgets of the same pass already see them. Validation results are
/// written for widgets whose own path was part of the update; any other
/// widget whose validity flips is reported valid until it is touched. A
/// custom path always carries its widget's recorded validity.
pub fn update_section(
    context: &UpdateContext<'_>,
    section_name: &str,
    document: InterviewDocument,
    affected: AffectedPaths,
    proposed: &Changeset,
) -> Result<SectionUpdate, UpdateSectionError> {
    let section = context
        .questionnaire
        .section(section_name)
        .ok_or_else(|| UpdateSectionError::UnknownSection(section_name.to_string()))?;

    let mut document = document;
    let mut issues = Vec::<StructuredIssue>::new();
    let apply_result = apply_changeset(&mut document, proposed, &context.guard_policy);
    for rejection in &apply_result.rejected {
        issues.push(rejection_issue(rejection));
    }
    let mut applied = accepted_changes(proposed, &apply_result.rejected);

    let mut affected = affected;
    affected.extend_from_changeset(&applied);
    let mut dirty = affected.clone();

    let max_iterations = context.config.engine.max_update_iterations.max(1);
    let mut statuses = BTreeMap::<String, (usize, WidgetStatus)>::new();
    let mut iterations = 0usize;
    let mut converged = false;
    let mut pending_paths = Vec::<String>::new();

    while iterations < max_iterations {
        iterations += 1;
        let instances = context.questionnaire.section_instances(section, &document);
        let mut corrected = Vec::<String>::new();

        for (order, instance) in instances.iter().enumerate() {
            let WidgetConfig::Question(question) = instance.widget else {
                continue;
            };
            let rule_context = RuleContext::new(&document, &instance.path, context.config)
                .with_custom_path(instance.custom_path.as_deref());
            let mut dependencies = collect_rule_dependencies(question, &rule_context)
                .map_err(|source| rule_error(instance, source))?;
            dependencies.extend(instance.placeholder_sources.iter().cloned());
            if !dirty.intersects(&dependencies) {
                continue;
            }
            let evaluation = evaluate_widget(question, &rule_context, context.registry)
                .map_err(|source| rule_error(instance, source))?;

            if let Some(target) = &evaluation.corrected_value {
                apply_correction(&mut document, &mut applied, &instance.path, target)?;
                dirty.insert(&instance.path);
                corrected.push(instance.path.clone());
            }
            if let (Some(custom_path), Some(target)) =
                (&instance.custom_path, &evaluation.custom_corrected_value)
            {
                apply_correction(&mut document, &mut applied, custom_path, target)?;
                dirty.insert(custom_path);
                corrected.push(custom_path.clone());
            }

            let (valid, messages) = record_validity(
                &mut document,
                &mut applied,
                &affected,
                &instance.path,
                evaluation.valid,
                evaluation.messages,
            )?;
            if let Some(custom_path) = &instance.custom_path {
                record_custom_validity(&mut document, &mut applied, custom_path, valid)?;
            }
            statuses.insert(
                instance.path.clone(),
                (
                    order,
                    WidgetStatus {
                        widget: instance.name.to_string(),
                        path: instance.path.clone(),
                        custom_path: instance.custom_path.clone(),
                        group_path: instance.group_path.clone(),
                        visible: evaluation.visible,
                        valid,
                        value: evaluation.value,
                        custom_value: evaluation.custom_value,
                        messages,
                    },
                ),
            );
        }

        if corrected.is_empty() {
            converged = true;
            break;
        }
        tracing::debug!(
            section = section_name,
            iteration = iterations,
            corrected = corrected.len(),
            "section corrections applied"
        );
        pending_paths = corrected;
    }

    if !converged {
        if context.config.engine.strict_convergence {
            return Err(UpdateSectionError::DidNotConverge {
                section: section_name.to_string(),
                iterations,
                pending_paths,
            });
        }
        tracing::warn!(
            section = section_name,
            iterations,
            pending = ?pending_paths,
            "section update hit the iteration cap; widgets may be correcting each other"
        );
        issues.push(
            StructuredIssue::new(
                "convergence",
                IssueSeverity::Warning,
                section_name,
                format!("section `{section_name}` did not converge after {iterations} iterations"),
            )
            .with_reference("engine.update.iteration_cap")
            .with_related(json!({ "pending_paths": pending_paths })),
        );
    }

    let evaluated = statuses.keys().cloned().collect::<Vec<_>>();
    let mut statuses = statuses.into_values().collect::<Vec<_>>();
    statuses.sort_by(|(left, _), (right, _)| left.cmp(right));
    let statuses = statuses
        .into_iter()
        .map(|(_, status)| status)
        .collect::<Vec<_>>();

    let all_widgets_valid = statuses.iter().all(|status| status.valid || !status.visible)
        && context
            .questionnaire
            .section_instances(section, &document)
            .iter()
            .filter(|instance| matches!(instance.widget, WidgetConfig::Question(_)))
            .filter(|instance| !evaluated.contains(&instance.path))
            .all(|instance| document.validation(&instance.path) != Some(false));

    StructuredIssue::sort_stable(&mut issues);
    Ok(SectionUpdate {
        document,
        applied,
        statuses,
        iterations,
        converged,
        all_widgets_valid,
        issues,
    })
}

/// Evaluates every widget of the section for display without touching the
/// document.
pub fn describe_section(
    context: &UpdateContext<'_>,
    section_name: &str,
    document: &InterviewDocument,
) -> Result<Vec<DescribedWidget>, UpdateSectionError> {
    let section = context
        .questionnaire
        .section(section_name)
        .ok_or_else(|| UpdateSectionError::UnknownSection(section_name.to_string()))?;

    let mut described = Vec::<DescribedWidget>::new();
    for instance in context.questionnaire.section_instances(section, document) {
        let rule_context = RuleContext::new(document, &instance.path, context.config)
            .with_custom_path(instance.custom_path.as_deref());
        let (visible, question) = match instance.widget {
            WidgetConfig::Question(question) => {
                let description = describe_widget(question, &rule_context, context.registry)
                    .map_err(|source| rule_error(&instance, source))?;
                (description.evaluation.visible, Some(description))
            }
            widget => {
                let outcome =
                    evaluate_conditional(widget.conditional(), &rule_context, context.registry)
                        .map_err(|source| rule_error(&instance, source))?;
                (outcome.visible, None)
            }
        };
        described.push(DescribedWidget {
            widget: instance.name.to_string(),
            path: instance.path.clone(),
            group_path: instance.group_path.clone(),
            visible,
            question,
        });
    }
    Ok(described)
}

fn accepted_changes(proposed: &Changeset, rejected: &[ChangesetRejection]) -> Changeset {
    let is_rejected = |path: &str| rejected.iter().any(|rejection| rejection.path == path);
    let mut accepted = Changeset::new();
    for path in proposed.unset_paths() {
        if !is_rejected(path) {
            accepted.unset(path.clone());
        }
    }
    for (path, value) in proposed.values_by_path() {
        if !is_rejected(path) {
            accepted.set_change(path.clone(), value.clone());
        }
    }
    accepted
}

/// A `null` correction clears the stored value.
fn apply_correction(
    document: &mut InterviewDocument,
    applied: &mut Changeset,
    path: &str,
    target: &Value,
) -> Result<(), UpdateSectionError> {
    let absolute = response_path(path);
    if target.is_null() {
        document.unset(&absolute);
        applied.set_undefined(absolute);
        return Ok(());
    }
    document
        .set(&absolute, target.clone())
        .map_err(|source| UpdateSectionError::Write {
            path: absolute.clone(),
            source,
        })?;
    applied.set(absolute, target.clone());
    Ok(())
}

fn record_validity(
    document: &mut InterviewDocument,
    applied: &mut Changeset,
    affected: &AffectedPaths,
    path: &str,
    valid: bool,
    messages: Vec<String>,
) -> Result<(bool, Vec<String>), UpdateSectionError> {
    let stored = document.validation(path);
    if stored == Some(valid) {
        return Ok((valid, messages));
    }
    let (valid, messages) = if affected.contains(path) {
        (valid, messages)
    } else {
        (true, Vec::new())
    };
    if stored != Some(valid) {
        document
            .set_validation(path, valid)
            .map_err(|source| UpdateSectionError::Write {
                path: validation_path(path),
                source,
            })?;
        applied.set(validation_path(path), Value::Bool(valid));
    }
    Ok((valid, messages))
}

fn record_custom_validity(
    document: &mut InterviewDocument,
    applied: &mut Changeset,
    custom_path: &str,
    valid: bool,
) -> Result<(), UpdateSectionError> {
    if document.validation(custom_path) == Some(valid) {
        return Ok(());
    }
    document
        .set_validation(custom_path, valid)
        .map_err(|source| UpdateSectionError::Write {
            path: validation_path(custom_path),
            source,
        })?;
    applied.set(validation_path(custom_path), Value::Bool(valid));
    Ok(())
}

fn rule_error(instance: &WidgetInstance<'_>, source: RuleError) -> UpdateSectionError {
    UpdateSectionError::Rule {
        widget: instance.name.to_string(),
        path: instance.path.clone(),
        source,
    }
}

fn rejection_issue(rejection: &ChangesetRejection) -> StructuredIssue {
    StructuredIssue::new(
        "changeset_rejected",
        IssueSeverity::Warning,
        rejection.path.as_str(),
        format!("change to `{}` rejected: {}", rejection.path, rejection.reason),
    )
    .with_reference("engine.update.guard_rejected")
}

#[cfg(test)]
#[path = "section_test.rs"]
mod tests;
