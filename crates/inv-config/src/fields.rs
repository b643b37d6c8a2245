//! Tracked metadata field list parsing.

/// Separators accepted between metadata field names.
pub const FIELD_SEPARATORS: [char; 3] = ['|', ';', ','];

/// Split a delimiter-separated field list into trimmed, non-empty names.
///
/// Names keep their first-seen order; repeated names are dropped so a field
/// is never counted twice for one row.
pub fn parse_metadata_fields(raw: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for name in raw.split(FIELD_SEPARATORS).map(str::trim) {
        if name.is_empty() || fields.iter().any(|f| f == name) {
            continue;
        }
        fields.push(name.to_string());
    }
    fields
}
