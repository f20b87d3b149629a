// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::attributes::{Attributes, WellKnown};
use crate::model::AttributeValue;
use crate::segment::Sql;

/// Relational `db.system` values. Other databases, such as redis or mongodb, get no `sql`
/// object.
const SQL_SYSTEMS: &[&str] = &[
    "db2",
    "derby",
    "hive",
    "mariadb",
    "mssql",
    "mysql",
    "oracle",
    "postgresql",
    "sqlite",
    "teradata",
    "other_sql",
];

const DEFAULT_DB_HOST: &str = "localhost";

/// Builds the `sql` object for relational database calls. The database attributes are consumed
/// only when the object is written.
pub(super) fn write<'a>(attributes: &mut Attributes<'_, 'a>) -> Option<Sql<'a>> {
    let connection_string = attributes
        .get(WellKnown::DbConnectionString)
        .and_then(AttributeValue::to_text);
    let system = attributes.get(WellKnown::DbSystem).and_then(AttributeValue::to_text);
    let instance = attributes.get(WellKnown::DbName).and_then(AttributeValue::to_text);
    let statement = attributes.get(WellKnown::DbStatement).and_then(AttributeValue::to_text);
    let user = attributes.get(WellKnown::DbUser).and_then(AttributeValue::to_text);

    if !system
        .as_deref()
        .is_some_and(|system| SQL_SYSTEMS.contains(&system))
    {
        attributes.rollback();
        return None;
    }

    let host = connection_string
        .as_deref()
        .filter(|host| !host.is_empty())
        .unwrap_or(DEFAULT_DB_HOST);
    let url = format!("{host}/{}", instance.as_deref().unwrap_or_default());

    attributes.commit();
    Some(Sql {
        url,
        database_type: system,
        user,
        sanitized_query: statement,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attributes::AttributeTable;
    use crate::model::KeyValue;
    use serde_json::json;

    fn write_json(source: Vec<KeyValue>) -> (Option<serde_json::Value>, Vec<String>) {
        let mut table = AttributeTable::default();
        let mut attributes = table.bind(&source);
        let sql = write(&mut attributes).map(|sql| serde_json::to_value(sql).unwrap());
        let remaining = attributes
            .unconsumed()
            .map(|(key, _)| key.to_string())
            .collect();
        (sql, remaining)
    }

    #[test]
    fn test_mysql_call() {
        let (sql, remaining) = write_json(vec![
            KeyValue::new("db.system", "mysql"),
            KeyValue::new("db.name", "customers"),
            KeyValue::new("db.statement", "SELECT * FROM customers WHERE id = ?"),
            KeyValue::new("db.user", "readonly"),
            KeyValue::new("db.connection_string", "mysql://db.example.com:3306"),
        ]);
        assert_eq!(
            sql.unwrap(),
            json!({
                "url": "mysql://db.example.com:3306/customers",
                "database_type": "mysql",
                "user": "readonly",
                "sanitized_query": "SELECT * FROM customers WHERE id = ?"
            })
        );
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_missing_connection_string_uses_localhost() {
        let (sql, _) = write_json(vec![
            KeyValue::new("db.system", "postgresql"),
            KeyValue::new("db.name", "orders"),
        ]);
        assert_eq!(sql.unwrap()["url"], "localhost/orders");
    }

    #[test]
    fn test_non_relational_system_is_skipped() {
        let (sql, remaining) = write_json(vec![
            KeyValue::new("db.system", "redis"),
            KeyValue::new("db.statement", "GET key"),
        ]);
        assert!(sql.is_none());
        assert_eq!(remaining, vec!["db.system", "db.statement"]);

        let (sql, _) = write_json(vec![KeyValue::new("db.name", "orders")]);
        assert!(sql.is_none());
    }
}
