use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = crate::Error;

    fn from_str(value: &str) -> crate::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(crate::Error::Validation(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// One `(field, direction)` pass of a multi-criterion sort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortCriterion {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortCriterion {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Parses `field` or `field:direction`.
impl std::str::FromStr for SortCriterion {
    type Err = crate::Error;

    fn from_str(value: &str) -> crate::Result<Self> {
        let (field, direction) = match value.split_once(':') {
            Some((field, direction)) => (field, direction.parse()?),
            None => (value, SortDirection::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(crate::Error::Validation(
                "sort criterion field cannot be empty".to_owned(),
            ));
        }
        Ok(Self::new(field, direction))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortSuggestion {
    pub name: String,
    pub description: String,
    pub criteria: Vec<SortCriterion>,
}
