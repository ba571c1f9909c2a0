//! Query filters for the table store's REST dialect.

/// A filter over one table: equality and case-insensitive pattern clauses
/// plus an optional column projection and row limit.
///
/// Renders to the query-string dialect the hosted table store expects:
/// `?category=eq.tea&email=ilike.user@x.com&select=id,name&limit=1`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
    select: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Clone)]
enum Clause {
    /// Exact equality on a column.
    Eq { column: String, value: String },
    /// Case-insensitive pattern match (`%` wildcards, or an exact
    /// case-insensitive value when no wildcard is given).
    ILike { column: String, pattern: String },
}

impl Filter {
    /// An empty filter (matches every row).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.clauses.push(Clause::Eq {
            column: column.to_owned(),
            value: value.to_string(),
        });
        self
    }

    /// Add a case-insensitive pattern clause.
    #[must_use]
    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.clauses.push(Clause::ILike {
            column: column.to_owned(),
            pattern: pattern.into(),
        });
        self
    }

    /// Project specific columns (comma-separated), e.g. `"id,name,price"`.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_owned());
        self
    }

    /// Cap the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, rows: u32) -> Self {
        self.limit = Some(rows);
        self
    }

    /// Render as query-string pairs for the HTTP client.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .clauses
            .iter()
            .map(|clause| match clause {
                Clause::Eq { column, value } => (column.clone(), format!("eq.{value}")),
                Clause::ILike { column, pattern } => (column.clone(), format!("ilike.{pattern}")),
            })
            .collect();

        if let Some(select) = &self.select {
            pairs.push(("select".to_owned(), select.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_owned(), limit.to_string()));
        }

        pairs
    }

    /// Case-insensitive local evaluation of this filter against a row.
    ///
    /// Mirrors the remote matching semantics closely enough for scripted
    /// test gateways; only string and integer columns are compared.
    #[must_use]
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq { column, value } => row.get(column).is_some_and(|v| match v {
                serde_json::Value::String(s) => s == value,
                other => other.to_string() == *value,
            }),
            Clause::ILike { column, pattern } => {
                row.get(column)
                    .and_then(serde_json::Value::as_str)
                    .is_some_and(|s| {
                        let s = s.to_lowercase();
                        let pattern = pattern.to_lowercase();
                        match (
                            pattern.strip_prefix('%'),
                            pattern.strip_suffix('%'),
                        ) {
                            (Some(rest), _) if rest.ends_with('%') => {
                                s.contains(rest.trim_end_matches('%'))
                            }
                            (Some(suffix), None) => s.ends_with(suffix),
                            (None, Some(prefix)) => s.starts_with(prefix),
                            (None, None) => s == pattern,
                            _ => false,
                        }
                    })
            }
        })
    }
}
