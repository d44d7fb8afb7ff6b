use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A boolean test against the document. `path` is resolved relative to the
/// widget path (`../` climbs, placeholders interpolate); omitted means the
/// widget's own value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Always,
    Never,
    IsBlank {
        #[serde(default)]
        path: Option<String>,
    },
    NotBlank {
        #[serde(default)]
        path: Option<String>,
    },
    Equals {
        #[serde(default)]
        path: Option<String>,
        value: Value,
    },
    NotEquals {
        #[serde(default)]
        path: Option<String>,
        value: Value,
    },
    OneOf {
        #[serde(default)]
        path: Option<String>,
        values: Vec<Value>,
    },
    GreaterThan {
        #[serde(default)]
        path: Option<String>,
        value: f64,
    },
    LessThan {
        #[serde(default)]
        path: Option<String>,
        value: f64,
    },
    Matches {
        #[serde(default)]
        path: Option<String>,
        pattern: String,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
    Registered {
        name: String,
    },
}

/// What happens to the stored value while the widget is hidden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HiddenValue {
    #[default]
    Keep,
    Clear,
    Assign {
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionalRule {
    Registered {
        registered: String,
    },
    Declarative {
        when: Condition,
        #[serde(default)]
        on_hidden: HiddenValue,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyPeriodCheck {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationRule {
    Registered {
        registered: String,
        #[serde(default)]
        message: Option<String>,
    },
    OutsideSurveyPeriod {
        outside_survey_period: SurveyPeriodCheck,
        message: String,
    },
    FailsWhen {
        fails_when: Condition,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRule {
    Lit {
        lit: Value,
    },
    Ref {
        #[serde(rename = "ref")]
        ref_path: String,
    },
    Registered {
        registered: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conditional_rule_shapes_deserialize() {
        let registered: ConditionalRule =
            serde_json::from_value(json!({"registered": "personIsAdult"})).expect("must parse");
        assert_eq!(
            registered,
            ConditionalRule::Registered {
                registered: "personIsAdult".to_string()
            }
        );

        let declarative: ConditionalRule = serde_json::from_value(json!({
            "when": {"op": "greater_than", "path": "../age", "value": 15},
            "on_hidden": {"action": "assign", "value": "no"}
        }))
        .expect("must parse");
        assert_eq!(
            declarative,
            ConditionalRule::Declarative {
                when: Condition::GreaterThan {
                    path: Some("../age".to_string()),
                    value: 15.0
                },
                on_hidden: HiddenValue::Assign { value: json!("no") },
            }
        );
    }

    #[test]
    fn validation_rule_shapes_deserialize() {
        let rules: Vec<ValidationRule> = serde_json::from_value(json!([
            {"fails_when": {"op": "is_blank"}, "message": "required"},
            {"outside_survey_period": {}, "message": "out of period"},
            {"registered": "ageIsPlausible"}
        ]))
        .expect("must parse");
        assert!(matches!(rules[0], ValidationRule::FailsWhen { .. }));
        assert!(matches!(
            &rules[1],
            ValidationRule::OutsideSurveyPeriod { outside_survey_period, .. }
                if outside_survey_period.path.is_none()
        ));
        assert!(matches!(
            &rules[2],
            ValidationRule::Registered { message: None, .. }
        ));
    }

    #[test]
    fn value_rules_follow_lit_and_ref_shapes() {
        let rules: Vec<ValueRule> =
            serde_json::from_value(json!([{"lit": 3}, {"ref": "../household.size"}]))
                .expect("must parse");
        assert_eq!(rules[0], ValueRule::Lit { lit: json!(3) });
        assert_eq!(
            rules[1],
            ValueRule::Ref {
                ref_path: "../household.size".to_string()
            }
        );
    }
}
