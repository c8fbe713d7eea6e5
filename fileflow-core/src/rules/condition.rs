use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    #[serde(alias = "in_set", alias = "inSet")]
    In,
    #[serde(alias = "less_than", alias = "lessThan")]
    Lt,
    #[serde(alias = "greater_than", alias = "greaterThan")]
    Gt,
    #[serde(alias = "hasTag")]
    HasTag,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::In => "in",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::HasTag => "has_tag",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ConditionOperator::Equals, value.into())
    }

    pub fn in_set<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            ConditionOperator::In,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ConditionOperator::Lt, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, ConditionOperator::Gt, value.into())
    }

    pub fn has_tag(field: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(field, ConditionOperator::HasTag, Value::String(tag.into()))
    }

    /// Checks the threshold shape for the operator. Runtime type mismatches
    /// against actual values are still possible and handled by the evaluator.
    pub fn validate(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(Error::Validation(
                "condition field cannot be empty".to_owned(),
            ));
        }

        let valid = match self.operator {
            ConditionOperator::Equals => !self.value.is_null(),
            ConditionOperator::In => self.value.is_array(),
            ConditionOperator::Lt | ConditionOperator::Gt => {
                self.value.is_number() || self.value.is_string()
            }
            ConditionOperator::HasTag => self.value.is_string(),
        };
        if !valid {
            let expected = match self.operator {
                ConditionOperator::Equals => "a non-null value",
                ConditionOperator::In => "an array",
                ConditionOperator::Lt | ConditionOperator::Gt => "a number or string",
                ConditionOperator::HasTag => "a string",
            };
            return Err(Error::Validation(format!(
                "condition on '{}' with operator '{}' requires {expected}, got {}",
                self.field,
                self.operator.as_str(),
                self.value
            )));
        }
        Ok(())
    }
}

pub fn validate_conditions(conditions: &[Condition], owner: &str) -> Result<()> {
    for (index, condition) in conditions.iter().enumerate() {
        condition.validate().map_err(|err| match err {
            Error::Validation(message) => {
                Error::Validation(format!("{owner} condition #{index}: {message}"))
            }
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Condition, ConditionOperator};

    #[test]
    fn deserializes_operator_aliases() {
        let condition: Condition = serde_json::from_value(json!({
            "field": "extension",
            "operator": "in_set",
            "value": ["pdf"]
        }))
        .expect("condition should parse");
        assert_eq!(condition.operator, ConditionOperator::In);

        let condition: Condition = serde_json::from_value(json!({
            "field": "size",
            "operator": "greater_than",
            "value": 10
        }))
        .expect("condition should parse");
        assert_eq!(condition.operator, ConditionOperator::Gt);
    }

    #[test]
    fn rejects_unknown_operator_at_parse_time() {
        let parsed = serde_json::from_value::<Condition>(json!({
            "field": "size",
            "operator": "approximately",
            "value": 10
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        let in_scalar = Condition::new("extension", ConditionOperator::In, json!("pdf"));
        let err = in_scalar.validate().expect_err("in requires an array");
        assert!(err.to_string().contains("requires an array"));

        let empty_field = Condition::equals("  ", "x");
        assert!(empty_field.validate().is_err());

        let tag_number = Condition::new("tags", ConditionOperator::HasTag, json!(3));
        assert!(tag_number.validate().is_err());

        assert!(Condition::gt("size", 10).validate().is_ok());
        assert!(Condition::in_set("extension", ["pdf", "txt"]).validate().is_ok());
    }
}
