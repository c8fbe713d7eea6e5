pub mod engine;
pub mod fields;
pub mod suggestions;
pub mod types;

pub use engine::{Classification, SortingEngine, FALLBACK_CATEGORY};
pub use fields::{sort_key, FieldAccessor, SortKey};
pub use suggestions::{default_criteria, detect_category, suggest_sort_criteria};
pub use types::{SortCriterion, SortDirection, SortSuggestion};
