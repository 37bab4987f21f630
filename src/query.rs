//! List query parameters and their validation

use serde::Deserialize;

use crate::error::FieldError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

/// Raw `?page&limit&category&search` parameters as they arrive on the wire.
///
/// Numbers are kept as text so a malformed value becomes a field error
/// instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatQuery {
    pub page: i64,
    pub limit: i64,
    pub filter: ThreatFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ThreatQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total - 1) / self.limit + 1
    }
}

impl PaginationQuery {
    pub fn validate(self) -> Result<ThreatQuery, FieldError> {
        let page = parse_positive(
            "page",
            self.page.as_deref(),
            DEFAULT_PAGE,
            "Page number should be an integer",
            "Page must be at least 1",
        )?;
        let limit = parse_positive(
            "limit",
            self.limit.as_deref(),
            DEFAULT_LIMIT,
            "Limit should be an integer",
            "Limit must be at least 1",
        )?;

        if (page - 1).checked_mul(limit).is_none() {
            return Err(FieldError::new("page", "Page is out of range"));
        }

        Ok(ThreatQuery {
            page,
            limit,
            filter: ThreatFilter {
                category: non_blank(self.category),
                search: non_blank(self.search),
            },
        })
    }
}

fn parse_positive(
    field: &'static str,
    raw: Option<&str>,
    default: i64,
    not_integer: &str,
    below_minimum: &str,
) -> Result<i64, FieldError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };
    let value: i64 = raw
        .parse()
        .map_err(|_| FieldError::new(field, not_integer))?;
    if value < 1 {
        return Err(FieldError::new(field, below_minimum));
    }
    Ok(value)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
