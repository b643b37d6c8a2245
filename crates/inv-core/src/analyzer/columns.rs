//! Header-name column resolution.

use std::collections::HashMap;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const ACCESS_TIER: &str = "AccessTier";
pub const METADATA: &str = "Metadata";

/// Columns every inventory file must carry, by exact header name.
pub const REQUIRED_COLUMNS: [&str; 3] = [CONTENT_LENGTH, ACCESS_TIER, METADATA];

/// Header name → zero-based position, built once per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Index a header row. When a name repeats, its first position wins.
    pub fn from_header<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positions = HashMap::new();
        for (idx, name) in names.into_iter().enumerate() {
            positions.entry(name.into()).or_insert(idx);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Resolve the required columns, or name the first one missing.
    pub fn required(&self) -> Result<RequiredColumns, &'static str> {
        let find = |name: &'static str| self.position(name).ok_or(name);
        Ok(RequiredColumns {
            content_length: find(CONTENT_LENGTH)?,
            access_tier: find(ACCESS_TIER)?,
            metadata: find(METADATA)?,
        })
    }
}

/// Positions of the required columns within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredColumns {
    pub content_length: usize,
    pub access_tier: usize,
    pub metadata: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_by_name_not_position() {
        let a = ColumnIndex::from_header(["Name", "Content-Length", "AccessTier", "Metadata"]);
        let b = ColumnIndex::from_header(["Metadata", "AccessTier", "Name", "Content-Length"]);
        assert_eq!(
            a.required(),
            Ok(RequiredColumns {
                content_length: 1,
                access_tier: 2,
                metadata: 3,
            })
        );
        assert_eq!(
            b.required(),
            Ok(RequiredColumns {
                content_length: 3,
                access_tier: 1,
                metadata: 0,
            })
        );
    }

    #[test]
    fn test_reports_first_missing_column() {
        let index = ColumnIndex::from_header(["Name", "Content-Length", "Metadata"]);
        assert_eq!(index.required(), Err(ACCESS_TIER));
        let index = ColumnIndex::from_header(Vec::<String>::new());
        assert_eq!(index.required(), Err(CONTENT_LENGTH));
    }

    #[test]
    fn test_match_is_exact() {
        let index = ColumnIndex::from_header(["content-length", "AccessTier", "Metadata"]);
        assert_eq!(index.required(), Err(CONTENT_LENGTH));
        let index = ColumnIndex::from_header([" Content-Length", "AccessTier", "Metadata"]);
        assert_eq!(index.required(), Err(CONTENT_LENGTH));
    }

    #[test]
    fn test_duplicate_header_keeps_first() {
        let index = ColumnIndex::from_header(["Metadata", "Content-Length", "Metadata"]);
        assert_eq!(index.position(METADATA), Some(0));
    }
}
