use crate::rules::types::SortingRule;

/// Active rules in evaluation order: ascending priority, then creation time,
/// then id. Rules without a creation time sort first.
pub fn order_rules_by_priority(rules: &[SortingRule]) -> Vec<&SortingRule> {
    let mut ordered: Vec<&SortingRule> = rules.iter().filter(|rule| rule.is_active).collect();
    ordered.sort_by(|left, right| {
        left.priority
            .cmp(&right.priority)
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::order_rules_by_priority;
    use crate::rules::types::SortingRule;

    fn rule(id: &str, priority: i32, created_secs: i64) -> SortingRule {
        let mut rule = SortingRule::new(id, id).with_priority(priority);
        rule.created_at = Utc.timestamp_opt(created_secs, 0).single();
        rule
    }

    #[test]
    fn orders_by_priority_then_creation_then_id() {
        let rules = vec![
            rule("late", 1, 200),
            rule("high", 5, 0),
            rule("b-early", 1, 100),
            rule("a-early", 1, 100),
            rule("low", -1, 300),
        ];
        let ids: Vec<&str> = order_rules_by_priority(&rules)
            .into_iter()
            .map(|rule| rule.id.as_str())
            .collect();
        assert_eq!(ids, vec!["low", "a-early", "b-early", "late", "high"]);
    }

    #[test]
    fn skips_inactive_rules() {
        let rules = vec![rule("on", 0, 0), rule("off", 0, 0).inactive()];
        let ordered = order_rules_by_priority(&rules);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, "on");
    }
}
