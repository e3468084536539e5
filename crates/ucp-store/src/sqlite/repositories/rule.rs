//! Rule repository.

use rusqlite::{Connection, OptionalExtension, params};
use ucp_core::RuleId;
use ucp_rules::{Rule, RuleType};

use crate::errors::{Result, StoreError};

/// Listing order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleOrder {
    /// The order the engine runs rules in: type stage, priority, name.
    #[default]
    Evaluation,
    /// Insertion order.
    Position,
    /// Most recently updated first.
    RecentlyUpdated,
}

/// Listing filter.
#[derive(Clone, Debug, Default)]
pub struct RuleFilter {
    /// Only rules of this type.
    pub rule_type: Option<RuleType>,
    /// Only rules with `is_active` set.
    pub active_only: bool,
    /// Include archived rules.
    pub include_archived: bool,
    /// Ordering.
    pub order: RuleOrder,
}

const TYPE_RANK: &str = "CASE rule_type
    WHEN 'normalization' THEN 0
    WHEN 'routing' THEN 1
    WHEN 'transformation' THEN 2
    WHEN 'validation' THEN 3
    WHEN 'safety' THEN 4
    ELSE 5 END";

/// Rule repository; every method takes `&Connection`.
pub struct RuleRepo;

impl RuleRepo {
    /// Insert or update a rule. An existing rule keeps its position.
    pub fn save(conn: &Connection, rule: &Rule) -> Result<()> {
        let body = rule.body();
        let _ = conn.execute(
            "INSERT INTO rules
               (id, rule_name, rule_type, priority, is_active, archived, version, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
               rule_name  = excluded.rule_name,
               rule_type  = excluded.rule_type,
               priority   = excluded.priority,
               is_active  = excluded.is_active,
               archived   = excluded.archived,
               version    = excluded.version,
               document   = excluded.document,
               updated_at = excluded.updated_at",
            params![
                rule.id.as_str(),
                body.rule_name,
                body.rule_type.as_str(),
                body.priority,
                body.is_active,
                rule.record.archived,
                rule.version(),
                serde_json::to_string(rule)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Rule by ID.
    pub fn get(conn: &Connection, id: &RuleId) -> Result<Option<Rule>> {
        let doc: Option<String> = conn
            .query_row("SELECT document FROM rules WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()?;
        Ok(doc.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    /// Rules matching `filter`.
    pub fn list(conn: &Connection, filter: &RuleFilter) -> Result<Vec<Rule>> {
        let mut sql = String::from("SELECT document FROM rules WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(rule_type) = filter.rule_type {
            sql.push_str(" AND rule_type = ?1");
            values.push(Box::new(rule_type.as_str()));
        }
        if filter.active_only {
            sql.push_str(" AND is_active = 1");
        }
        if !filter.include_archived {
            sql.push_str(" AND archived = 0");
        }
        match filter.order {
            RuleOrder::Evaluation => {
                sql.push_str(" ORDER BY ");
                sql.push_str(TYPE_RANK);
                sql.push_str(", priority ASC, rule_name ASC");
            }
            RuleOrder::Position => sql.push_str(" ORDER BY position ASC"),
            RuleOrder::RecentlyUpdated => sql.push_str(" ORDER BY updated_at DESC, position DESC"),
        }

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(Box::as_ref).collect();
        let docs = stmt
            .query_map(refs.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|d| serde_json::from_str(d).map_err(StoreError::from))
            .collect()
    }

    /// Every rule, archived included, in insertion order.
    pub fn all(conn: &Connection) -> Result<Vec<Rule>> {
        Self::list(
            conn,
            &RuleFilter {
                include_archived: true,
                order: RuleOrder::Position,
                ..RuleFilter::default()
            },
        )
    }

    /// Number of stored rules, archived included.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))?;
        Ok(crate::sqlite::from_db_int(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::run_migrations;
    use ucp_rules::{Condition, RuleAction, RuleBody, RuleEngine};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    fn saved_defaults(conn: &Connection) -> RuleEngine {
        let engine = RuleEngine::with_defaults("test").unwrap();
        for rule in engine.rules() {
            RuleRepo::save(conn, rule).unwrap();
        }
        engine
    }

    #[test]
    fn defaults_round_trip() {
        let conn = setup();
        let engine = saved_defaults(&conn);
        assert_eq!(RuleRepo::all(&conn).unwrap(), engine.rules());
        let reloaded = RuleEngine::from_rules(RuleRepo::all(&conn).unwrap()).unwrap();
        assert_eq!(reloaded.normalize("  explain   rust "), "explain rust");
    }

    #[test]
    fn evaluation_order_groups_by_stage() {
        let conn = setup();
        let mut engine = saved_defaults(&conn);
        let late = RuleBody::new(
            "aaa-late-normalizer",
            RuleType::Normalization,
            99,
            Condition::Always,
            RuleAction::CollapseWhitespace,
        );
        let rule = engine.insert(late, "test").unwrap().clone();
        RuleRepo::save(&conn, &rule).unwrap();

        let ordered = RuleRepo::list(&conn, &RuleFilter::default()).unwrap();
        let ranks: Vec<_> = ordered
            .iter()
            .map(|r| RuleType::ALL.iter().position(|t| *t == r.body().rule_type).unwrap())
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        let normalizers: Vec<_> = ordered
            .iter()
            .filter(|r| r.body().rule_type == RuleType::Normalization)
            .map(|r| r.body().rule_name.as_str())
            .collect();
        assert_eq!(normalizers.last(), Some(&"aaa-late-normalizer"));
    }

    #[test]
    fn type_and_archive_filters() {
        let conn = setup();
        let mut engine = saved_defaults(&conn);
        let safety = RuleFilter {
            rule_type: Some(RuleType::Safety),
            ..RuleFilter::default()
        };
        let before = RuleRepo::list(&conn, &safety).unwrap();
        assert!(!before.is_empty());
        assert!(before.iter().all(|r| r.body().rule_type == RuleType::Safety));

        let id = before[0].id.clone();
        let _ = engine.archive(&id, "test").unwrap();
        RuleRepo::save(&conn, engine.get(&id).unwrap()).unwrap();
        assert_eq!(RuleRepo::list(&conn, &safety).unwrap().len(), before.len() - 1);
        assert!(RuleRepo::get(&conn, &id).unwrap().unwrap().record.archived);
    }
}
