//! Listing filters and ordering
//!
//! Default visibility (no explicit state, `all` unset): INBOX and INVALID are
//! always hidden, DONE and CANCELLED unless asked for. Listings sort by state
//! rank (IN_PROGRESS, NEW, rest), then priority rank (high, medium, low),
//! then newest first.

use rusqlite::types::Value;

use super::schema::COLUMNS;
use crate::domain::{Kind, Priority, State};

/// Listing order: state rank, priority rank, newest first
pub fn list_order() -> String {
    format!(
        "ORDER BY {}, {}, created DESC, rowid DESC",
        rank_case("state", State::ALL.iter().map(|s| (s.as_str(), s.rank()))),
        priority_case()
    )
}

/// Children order: priority rank, oldest first
pub fn child_order() -> String {
    format!("ORDER BY {}, created ASC, rowid ASC", priority_case())
}

fn priority_case() -> String {
    rank_case("priority", Priority::ALL.iter().map(|p| (p.as_str(), p.rank())))
}

/// `CASE column WHEN 'value' THEN rank ... END` over every stored value
fn rank_case<'a>(column: &str, ranks: impl Iterator<Item = (&'a str, u8)>) -> String {
    let arms: String = ranks
        .map(|(value, rank)| format!(" WHEN '{value}' THEN {rank}"))
        .collect();
    format!("CASE {column}{arms} END")
}

pub const NEWEST_FIRST: &str = "ORDER BY created DESC, rowid DESC";

/// Options for [`crate::storage::TaskStore::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub state: Option<State>,
    pub priority: Option<Priority>,
    pub kind: Option<Kind>,
    /// Substring of the stored tag text, so "db" also matches "database"
    pub tag: Option<String>,
    /// Only tasks with a blocker
    pub blocked: bool,
    pub show_done: bool,
    pub show_cancelled: bool,
    /// Maximum rows when greater than zero; ignored with `all`
    pub limit: usize,
    /// Skip default visibility and the limit
    pub all: bool,
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter that returns every task
    pub fn everything() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    /// States hidden by default visibility
    pub fn hidden_states(&self) -> Vec<State> {
        if self.all || self.state.is_some() {
            return Vec::new();
        }

        let mut hidden = vec![State::Inbox, State::Invalid];
        if !self.show_done {
            hidden.push(State::Done);
        }
        if !self.show_cancelled {
            hidden.push(State::Cancelled);
        }
        hidden
    }

    pub fn effective_limit(&self) -> Option<usize> {
        if !self.all && self.limit > 0 {
            Some(self.limit)
        } else {
            None
        }
    }

    pub fn to_query(&self) -> Query {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(state) = self.state {
            params.push(Value::Text(state.as_str().to_string()));
            clauses.push(format!("state = ?{}", params.len()));
        }

        let hidden = self.hidden_states();
        if !hidden.is_empty() {
            let mut slots = Vec::with_capacity(hidden.len());
            for state in hidden {
                params.push(Value::Text(state.as_str().to_string()));
                slots.push(format!("?{}", params.len()));
            }
            clauses.push(format!("state NOT IN ({})", slots.join(", ")));
        }

        if let Some(priority) = self.priority {
            params.push(Value::Text(priority.as_str().to_string()));
            clauses.push(format!("priority = ?{}", params.len()));
        }

        if let Some(kind) = self.kind {
            params.push(Value::Text(kind.as_str().to_string()));
            clauses.push(format!("kind = ?{}", params.len()));
        }

        if let Some(tag) = self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            params.push(Value::Text(contains_pattern(tag)));
            clauses.push(format!("tags LIKE ?{} ESCAPE '\\'", params.len()));
        }

        if self.blocked {
            clauses.push("blocked_by IS NOT NULL".to_string());
        }

        let mut sql = format!("SELECT {COLUMNS} FROM tasks");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push(' ');
        sql.push_str(&list_order());

        if let Some(limit) = self.effective_limit() {
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        Query { sql, params }
    }
}

/// LIKE pattern matching `text` anywhere, with wildcards in `text` escaped
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hides_inactive_states() {
        let filter = ListFilter::new();
        assert_eq!(
            filter.hidden_states(),
            vec![State::Inbox, State::Invalid, State::Done, State::Cancelled]
        );
    }

    #[test]
    fn show_flags_reveal_settled_states() {
        let filter = ListFilter {
            show_done: true,
            show_cancelled: true,
            ..ListFilter::default()
        };
        assert_eq!(filter.hidden_states(), vec![State::Inbox, State::Invalid]);
    }

    #[test]
    fn explicit_state_or_all_disables_visibility() {
        let by_state = ListFilter {
            state: Some(State::Inbox),
            ..ListFilter::default()
        };
        assert!(by_state.hidden_states().is_empty());
        assert!(ListFilter::everything().hidden_states().is_empty());
    }

    #[test]
    fn limit_only_applies_without_all() {
        let limited = ListFilter {
            limit: 5,
            ..ListFilter::default()
        };
        assert_eq!(limited.effective_limit(), Some(5));

        let all = ListFilter {
            limit: 5,
            all: true,
            ..ListFilter::default()
        };
        assert_eq!(all.effective_limit(), None);
        assert_eq!(ListFilter::new().effective_limit(), None);
    }

    #[test]
    fn query_numbers_parameters_in_order() {
        let filter = ListFilter {
            state: Some(State::New),
            priority: Some(Priority::High),
            tag: Some("db".to_string()),
            blocked: true,
            limit: 3,
            ..ListFilter::default()
        };
        let query = filter.to_query();

        assert!(query.sql.contains("state = ?1"));
        assert!(query.sql.contains("priority = ?2"));
        assert!(query.sql.contains("tags LIKE ?3"));
        assert!(query.sql.contains("blocked_by IS NOT NULL"));
        assert!(query.sql.ends_with("LIMIT ?4"));
        assert_eq!(query.params.len(), 4);
        assert_eq!(query.params[2], Value::Text("%db%".to_string()));
        assert_eq!(query.params[3], Value::Integer(3));
    }

    #[test]
    fn everything_has_no_where_clause() {
        let query = ListFilter::everything().to_query();
        assert!(!query.sql.contains("WHERE"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn order_follows_enum_ranks() {
        let order = list_order();

        assert!(order.contains("WHEN 'IN_PROGRESS' THEN 0"));
        assert!(order.contains("WHEN 'NEW' THEN 1"));
        assert!(order.contains("WHEN 'INBOX' THEN 2"));
        assert!(order.contains("WHEN 'high' THEN 0"));
        assert!(order.contains("WHEN 'low' THEN 2"));
        assert!(order.ends_with("created DESC, rowid DESC"));
        assert!(child_order().starts_with("ORDER BY CASE priority"));
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("plain"), "%plain%");
    }
}
