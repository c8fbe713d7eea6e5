use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::rules::evaluator::RuleEvaluator;
use crate::rules::precedence::order_rules_by_priority;
use crate::rules::types::SortingRule;
use crate::sorting::fields::FieldAccessor;
use crate::sorting::suggestions::{default_criteria, normalize_category};
use crate::sorting::types::{SortCriterion, SortDirection};
use crate::storage::model::FileRecord;

pub const FALLBACK_CATEGORY: &str = "misc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub file_id: String,
    pub category: String,
    pub rule_id: Option<String>,
}

/// Rule-based ordering and classification of file records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortingEngine {
    evaluator: RuleEvaluator,
}

impl SortingEngine {
    pub fn new() -> Self {
        Self {
            evaluator: RuleEvaluator::new(),
        }
    }

    /// Applies active rules in priority order. Each rule moves the files it
    /// matches to the front, ordered by its `sort_by` field; unmatched files
    /// keep their relative order behind them.
    pub fn apply_sorting_rules(
        &self,
        files: Vec<FileRecord>,
        rules: &[SortingRule],
    ) -> Vec<FileRecord> {
        order_rules_by_priority(rules)
            .into_iter()
            .fold(files, |current, rule| self.apply_rule(current, rule))
    }

    pub fn apply_rule(&self, files: Vec<FileRecord>, rule: &SortingRule) -> Vec<FileRecord> {
        let (mut matched, unmatched): (Vec<FileRecord>, Vec<FileRecord>) = files
            .into_iter()
            .partition(|file| self.evaluator.matches_all(&rule.conditions, &file.attributes));

        if matched.is_empty() {
            tracing::trace!(rule_id = %rule.id, "sorting rule matched no files");
            return unmatched;
        }

        if let Some(field) = rule.sort_by.as_deref() {
            stable_sort_by_field(&mut matched, field, rule.sort_order);
        }
        tracing::debug!(
            rule_id = %rule.id,
            matched = matched.len(),
            unmatched = unmatched.len(),
            "applied sorting rule"
        );

        matched.extend(unmatched);
        matched
    }

    /// One stable pass per criterion in list order; the last criterion is the
    /// primary key.
    pub fn sort_files(
        &self,
        mut files: Vec<FileRecord>,
        criteria: &[SortCriterion],
    ) -> Vec<FileRecord> {
        for criterion in criteria {
            stable_sort_by_field(&mut files, &criterion.field, criterion.direction);
        }
        files
    }

    pub fn categorize_file(&self, file: &FileRecord, rules: &[SortingRule]) -> Classification {
        let matched = order_rules_by_priority(rules).into_iter().find(|rule| {
            rule.category.is_some()
                && self
                    .evaluator
                    .matches_all(&rule.conditions, &file.attributes)
        });

        match matched {
            Some(rule) => Classification {
                file_id: file.id.clone(),
                category: rule.category.clone().unwrap_or_default(),
                rule_id: Some(rule.id.clone()),
            },
            None => Classification {
                file_id: file.id.clone(),
                category: FALLBACK_CATEGORY.to_owned(),
                rule_id: None,
            },
        }
    }

    pub fn classify(&self, files: &[FileRecord], rules: &[SortingRule]) -> Vec<Classification> {
        files
            .iter()
            .map(|file| self.categorize_file(file, rules))
            .collect()
    }

    /// Orders files of one category using the rules labelled with it, or the
    /// category's top suggestion when there are none.
    pub fn sort_by_category(
        &self,
        files: Vec<FileRecord>,
        category: &str,
        rules: &[SortingRule],
    ) -> Vec<FileRecord> {
        let category = normalize_category(category);
        let explicit: Vec<SortingRule> = rules
            .iter()
            .filter(|rule| {
                rule.is_active
                    && rule
                        .category
                        .as_deref()
                        .is_some_and(|label| normalize_category(label) == category)
            })
            .cloned()
            .collect();

        if !explicit.is_empty() {
            return self.apply_sorting_rules(files, &explicit);
        }

        self.sort_files(files, &default_criteria(&category))
    }
}

fn stable_sort_by_field(files: &mut [FileRecord], field: &str, direction: SortDirection) {
    let accessor = FieldAccessor::for_field(field);
    match direction {
        SortDirection::Asc => files.sort_by_cached_key(|file| accessor.extract(file)),
        SortDirection::Desc => files.sort_by_cached_key(|file| Reverse(accessor.extract(file))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SortingEngine, FALLBACK_CATEGORY};
    use crate::rules::condition::Condition;
    use crate::rules::types::SortingRule;
    use crate::sorting::types::{SortCriterion, SortDirection};
    use crate::storage::model::FileRecord;

    fn file(id: &str, attributes: serde_json::Value) -> FileRecord {
        FileRecord::new(id, attributes.as_object().cloned().expect("object"))
    }

    fn ids(files: &[FileRecord]) -> Vec<&str> {
        files.iter().map(|file| file.id.as_str()).collect()
    }

    fn sized(id: &str, file_type: &str, size: u64) -> FileRecord {
        file(id, json!({ "file_type": file_type, "file_size": size }))
    }

    #[test]
    fn single_criterion_directions_are_exact_reverses() {
        let engine = SortingEngine::new();
        let files = vec![
            sized("a", "pdf", 30),
            sized("b", "pdf", 10),
            sized("c", "pdf", 50),
            sized("d", "pdf", 20),
        ];

        let asc = engine.sort_files(files.clone(), &[SortCriterion::asc("file_size")]);
        let desc = engine.sort_files(files, &[SortCriterion::desc("file_size")]);

        let mut reversed = ids(&desc);
        reversed.reverse();
        assert_eq!(ids(&asc), vec!["b", "d", "a", "c"]);
        assert_eq!(ids(&asc), reversed);
    }

    #[test]
    fn last_criterion_dominates() {
        let engine = SortingEngine::new();
        let files = vec![
            sized("doc-small", "doc", 10),
            sized("pdf-big", "pdf", 90),
            sized("doc-big", "doc", 90),
            sized("jpg-small", "jpg", 10),
        ];

        let sorted = engine.sort_files(
            files,
            &[SortCriterion::asc("file_type"), SortCriterion::desc("file_size")],
        );

        assert_eq!(
            ids(&sorted),
            vec!["doc-big", "pdf-big", "doc-small", "jpg-small"]
        );
    }

    #[test]
    fn descending_pass_keeps_ties_in_input_order() {
        let engine = SortingEngine::new();
        let files = vec![sized("first", "a", 5), sized("second", "b", 5)];
        let sorted = engine.sort_files(files, &[SortCriterion::desc("file_size")]);
        assert_eq!(ids(&sorted), vec!["first", "second"]);
    }

    #[test]
    fn rule_moves_matched_files_first_and_is_idempotent() {
        let engine = SortingEngine::new();
        let rule = SortingRule::new("big-pdfs", "Big PDFs")
            .with_conditions(vec![Condition::equals("file_type", "pdf")])
            .sorted_by("file_size", SortDirection::Desc);
        let files = vec![
            sized("jpg", "jpg", 5),
            sized("pdf-small", "pdf", 10),
            sized("txt", "txt", 7),
            sized("pdf-big", "pdf", 70),
        ];

        let once = engine.apply_sorting_rules(files, std::slice::from_ref(&rule));
        assert_eq!(ids(&once), vec!["pdf-big", "pdf-small", "jpg", "txt"]);

        let twice = engine.apply_sorting_rules(once.clone(), std::slice::from_ref(&rule));
        assert_eq!(once, twice);
    }

    #[test]
    fn rule_without_matches_is_a_no_op() {
        let engine = SortingEngine::new();
        let rule = SortingRule::new("none", "None")
            .with_conditions(vec![Condition::equals("file_type", "mp4")])
            .sorted_by("file_size", SortDirection::Asc);
        let files = vec![sized("b", "pdf", 2), sized("a", "pdf", 1)];

        let sorted = engine.apply_sorting_rules(files.clone(), &[rule]);
        assert_eq!(sorted, files);
    }

    #[test]
    fn later_rule_owns_the_files_it_claims() {
        let engine = SortingEngine::new();
        let pdfs = SortingRule::new("pdfs", "PDFs")
            .with_conditions(vec![Condition::equals("file_type", "pdf")])
            .sorted_by("file_size", SortDirection::Asc)
            .with_priority(1);
        let large = SortingRule::new("large", "Large")
            .with_conditions(vec![Condition::gt("file_size", 50)])
            .sorted_by("file_size", SortDirection::Desc)
            .with_priority(2);
        let files = vec![
            sized("jpg-big", "jpg", 80),
            sized("pdf-big", "pdf", 60),
            sized("pdf-small", "pdf", 10),
        ];

        let sorted = engine.apply_sorting_rules(files, &[large, pdfs]);
        assert_eq!(ids(&sorted), vec!["jpg-big", "pdf-big", "pdf-small"]);
    }

    #[test]
    fn classification_falls_back_to_misc() {
        let engine = SortingEngine::new();
        let rules = vec![
            SortingRule::new("docs", "Documents")
                .with_conditions(vec![Condition::in_set("extension", ["pdf", "docx", "txt"])])
                .with_category("documents"),
            SortingRule::new("images", "Images")
                .with_conditions(vec![Condition::in_set("extension", ["jpg", "png"])])
                .with_category("images")
                .with_priority(1),
        ];
        let files = vec![
            file("1", json!({ "extension": "pdf" })),
            file("2", json!({ "extension": "jpg" })),
            file("3", json!({ "extension": "txt" })),
            file("4", json!({ "extension": "xyz" })),
        ];

        let categories: Vec<String> = engine
            .classify(&files, &rules)
            .into_iter()
            .map(|classification| classification.category)
            .collect();
        assert_eq!(
            categories,
            vec!["documents", "images", "documents", FALLBACK_CATEGORY]
        );
    }

    #[test]
    fn sort_by_category_uses_suggestions_without_rules() {
        let engine = SortingEngine::new();
        let files = vec![
            file("small", json!({ "width": 640, "height": 480 })),
            file("large", json!({ "width": 4000, "height": 3000 })),
        ];
        let sorted = engine.sort_by_category(files, "images", &[]);
        assert_eq!(ids(&sorted), vec!["large", "small"]);
    }

    #[test]
    fn sort_by_category_prefers_explicit_rules() {
        let engine = SortingEngine::new();
        let rule = SortingRule::new("by-name", "By name")
            .sorted_by("filename", SortDirection::Asc)
            .with_category("image");
        let files = vec![
            file("b", json!({ "filename": "b.png", "width": 10, "height": 10 })),
            file("a", json!({ "filename": "a.png", "width": 1, "height": 1 })),
        ];
        let sorted = engine.sort_by_category(files, "images", &[rule]);
        assert_eq!(ids(&sorted), vec!["a", "b"]);
    }
}
