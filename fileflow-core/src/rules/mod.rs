pub mod condition;
pub mod evaluator;
pub mod precedence;
pub mod types;

pub use condition::{validate_conditions, Condition, ConditionOperator};
pub use evaluator::RuleEvaluator;
pub use precedence::order_rules_by_priority;
pub use types::SortingRule;
