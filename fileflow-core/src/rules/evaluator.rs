use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::rules::condition::{Condition, ConditionOperator};
use crate::storage::model::{lookup_attribute, AttributeMap};

/// Evaluates condition sets against attribute maps. Conditions are ANDed, a
/// missing field fails closed, and evaluation errors are logged and count as
/// a non-match.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn matches_all(&self, conditions: &[Condition], attributes: &AttributeMap) -> bool {
        conditions
            .iter()
            .all(|condition| self.matches(condition, attributes))
    }

    pub fn matches(&self, condition: &Condition, attributes: &AttributeMap) -> bool {
        match self.evaluate(condition, attributes) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::warn!(
                    field = %condition.field,
                    operator = condition.operator.as_str(),
                    error = %err,
                    "condition evaluation failed; treating as non-matching"
                );
                false
            }
        }
    }

    pub fn evaluate(&self, condition: &Condition, attributes: &AttributeMap) -> Result<bool> {
        let Some(actual) = lookup_attribute(attributes, &condition.field) else {
            return Ok(false);
        };
        let expected = &condition.value;

        match condition.operator {
            ConditionOperator::Equals => Ok(values_equal(actual, expected)),
            ConditionOperator::In => {
                let Value::Array(options) = expected else {
                    return Err(Error::Evaluation(format!(
                        "operator 'in' on '{}' requires an array, got {expected}",
                        condition.field
                    )));
                };
                Ok(options.iter().any(|option| values_equal(actual, option)))
            }
            ConditionOperator::Lt => {
                compare_values(actual, expected, &condition.field).map(Ordering::is_lt)
            }
            ConditionOperator::Gt => {
                compare_values(actual, expected, &condition.field).map(Ordering::is_gt)
            }
            ConditionOperator::HasTag => has_tag(actual, expected, &condition.field),
        }
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn compare_values(actual: &Value, expected: &Value, field: &str) -> Result<Ordering> {
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return Ok(a.total_cmp(&b));
    }

    if let (Some(a), Some(b)) = (actual.as_str(), expected.as_str()) {
        if let (Some(a_time), Some(b_time)) = (parse_timestamp(a), parse_timestamp(b)) {
            return Ok(a_time.cmp(&b_time));
        }
        return Ok(a.cmp(b));
    }

    Err(Error::Evaluation(format!(
        "cannot compare '{field}' value {actual} with {expected}"
    )))
}

fn has_tag(actual: &Value, expected: &Value, field: &str) -> Result<bool> {
    let Some(tag) = expected.as_str() else {
        return Err(Error::Evaluation(format!(
            "operator 'has_tag' on '{field}' requires a string tag, got {expected}"
        )));
    };

    match actual {
        Value::Array(items) => Ok(items.iter().any(|item| item.as_str() == Some(tag))),
        Value::String(text) => Ok(text.split(',').any(|item| item.trim() == tag)),
        other => Err(Error::Evaluation(format!(
            "operator 'has_tag' on '{field}' requires a tag list, got {other}"
        ))),
    }
}

/// RFC 3339 first, then `YYYY-MM-DD HH:MM:SS` and bare dates, read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}
