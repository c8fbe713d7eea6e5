use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type AttributeMap = serde_json::Map<String, Value>;

/// A file as the engine sees it: an id owned by the `FileStore` and an opaque
/// attribute map. The engine reads and reorders these; it never edits content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl FileRecord {
    pub fn new(id: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        lookup_attribute(&self.attributes, key)
    }

    pub fn filename(&self) -> &str {
        self.attributes
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }

    /// Lowercase extension without the dot, from `extension` or the filename.
    pub fn extension(&self) -> Option<String> {
        if let Some(ext) = self.attributes.get("extension").and_then(Value::as_str) {
            return Some(ext.trim_start_matches('.').to_ascii_lowercase());
        }
        std::path::Path::new(self.filename())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Resolves `field` against an attribute map: the top-level key first, then
/// `metadata.<field>`, then a dotted path. `null` counts as absent.
pub fn lookup_attribute<'a>(attributes: &'a AttributeMap, field: &str) -> Option<&'a Value> {
    if let Some(value) = attributes.get(field) {
        return (!value.is_null()).then_some(value);
    }

    if let Some(value) = attributes
        .get("metadata")
        .and_then(Value::as_object)
        .and_then(|metadata| metadata.get(field))
    {
        return (!value.is_null()).then_some(value);
    }

    if !field.contains('.') {
        return None;
    }

    let mut segments = field.split('.');
    let first = segments.next()?;
    let mut current = attributes.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

#[cfg(test)]
mod tests {
    use super::{lookup_attribute, FileRecord};
    use serde_json::json;

    fn record(value: serde_json::Value) -> FileRecord {
        FileRecord::new("f1", value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn lookup_prefers_top_level_then_metadata_then_path() {
        let file = record(json!({
            "width": 10,
            "metadata": {"width": 20, "height": 30, "exif": {"iso": 400}},
        }));

        assert_eq!(file.attribute("width"), Some(&json!(10)));
        assert_eq!(file.attribute("height"), Some(&json!(30)));
        assert_eq!(file.attribute("metadata.exif.iso"), Some(&json!(400)));
        assert_eq!(lookup_attribute(&file.attributes, "missing"), None);
    }

    #[test]
    fn null_values_are_treated_as_absent() {
        let file = record(json!({"author": null}));
        assert_eq!(file.attribute("author"), None);
    }

    #[test]
    fn extension_falls_back_to_filename() {
        let file = record(json!({"filename": "Report.PDF"}));
        assert_eq!(file.extension().as_deref(), Some("pdf"));

        let explicit = record(json!({"filename": "a.bin", "extension": ".TXT"}));
        assert_eq!(explicit.extension().as_deref(), Some("txt"));
    }
}
