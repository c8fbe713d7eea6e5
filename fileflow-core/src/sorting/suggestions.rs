use crate::sorting::types::{SortCriterion, SortSuggestion};
use crate::storage::model::FileRecord;

pub const UNKNOWN_CATEGORY: &str = "unknown";

const CATEGORY_EXTENSIONS: &[(&str, &[&str])] = &[
    (
        "document",
        &[
            "doc", "docx", "pdf", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "ods", "odp",
            "csv", "tsv",
        ],
    ),
    (
        "image",
        &[
            "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "svg", "ico", "raw", "cr2",
            "nef", "arw",
        ],
    ),
    (
        "video",
        &[
            "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg", "ts",
            "mts",
        ],
    ),
    (
        "audio",
        &[
            "mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "aiff", "au", "ra", "ape", "opus",
        ],
    ),
    (
        "archive",
        &[
            "zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz", "tbz2", "txz", "cab", "iso",
        ],
    ),
    (
        "code",
        &[
            "py", "js", "java", "cpp", "c", "cs", "php", "rb", "go", "rs", "swift", "kt", "scala",
            "clj", "hs", "sh", "bash", "ps1", "sql", "html", "css", "xml", "json", "yaml", "yml",
            "toml", "ini", "cfg",
        ],
    ),
];

/// Category for a file based on its extension, or `unknown`.
pub fn detect_category(file: &FileRecord) -> &'static str {
    let Some(extension) = file.extension() else {
        return UNKNOWN_CATEGORY;
    };
    CATEGORY_EXTENSIONS
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(UNKNOWN_CATEGORY)
}

/// Maps plural and mixed-case labels onto the singular category names.
pub fn normalize_category(category: &str) -> String {
    let lowered = category.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "documents" | "docs" => "document".to_owned(),
        "images" | "photos" => "image".to_owned(),
        "videos" => "video".to_owned(),
        "archives" => "archive".to_owned(),
        "source" | "sources" => "code".to_owned(),
        _ => lowered,
    }
}

/// Named sort bundles for a category, most recommended first. Every list ends
/// with the generic size and alphabetical bundles.
pub fn suggest_sort_criteria(category: &str) -> Vec<SortSuggestion> {
    let mut suggestions = category_suggestions(&normalize_category(category));
    suggestions.push(suggestion(
        "Largest Files First",
        "Sort by file size, largest first",
        SortCriterion::desc("file_size"),
    ));
    suggestions.push(suggestion(
        "Alphabetical",
        "Sort alphabetically by filename",
        SortCriterion::asc("filename"),
    ));
    suggestions
}

/// Criteria of the top category-specific suggestion, or filename ascending.
pub fn default_criteria(category: &str) -> Vec<SortCriterion> {
    category_suggestions(&normalize_category(category))
        .into_iter()
        .next()
        .map(|suggestion| suggestion.criteria)
        .unwrap_or_else(|| vec![SortCriterion::asc("filename")])
}

fn category_suggestions(category: &str) -> Vec<SortSuggestion> {
    match category {
        "document" => vec![
            suggestion(
                "Recent Documents First",
                "Sort documents by creation date, newest first",
                SortCriterion::desc("created_at"),
            ),
            suggestion(
                "By Author",
                "Group documents by author",
                SortCriterion::asc("author"),
            ),
        ],
        "image" => vec![
            suggestion(
                "High Resolution First",
                "Sort images by resolution, highest first",
                SortCriterion::desc("resolution"),
            ),
            suggestion(
                "Recent Photos",
                "Sort photos by capture date, newest first",
                SortCriterion::desc("created_at"),
            ),
        ],
        "video" => vec![
            suggestion(
                "Longest Videos First",
                "Sort videos by duration, longest first",
                SortCriterion::desc("duration"),
            ),
            suggestion(
                "High Quality First",
                "Sort videos by resolution quality",
                SortCriterion::desc("resolution"),
            ),
        ],
        "audio" => vec![
            suggestion(
                "By Artist",
                "Group audio files by artist",
                SortCriterion::asc("artist"),
            ),
            suggestion(
                "Longest Tracks",
                "Sort by track duration, longest first",
                SortCriterion::desc("duration"),
            ),
        ],
        "code" => vec![
            suggestion(
                "By Language",
                "Group code files by programming language",
                SortCriterion::asc("language"),
            ),
            suggestion(
                "Recently Modified",
                "Sort by last modification date",
                SortCriterion::desc("modified_time"),
            ),
        ],
        "business" => vec![
            suggestion(
                "Recent Documents",
                "Sort business documents by date, newest first",
                SortCriterion::desc("created_at"),
            ),
            suggestion(
                "By Amount",
                "Sort financial documents by amount",
                SortCriterion::desc("amount"),
            ),
        ],
        _ => Vec::new(),
    }
}

fn suggestion(name: &str, description: &str, criterion: SortCriterion) -> SortSuggestion {
    SortSuggestion {
        name: name.to_owned(),
        description: description.to_owned(),
        criteria: vec![criterion],
    }
}
