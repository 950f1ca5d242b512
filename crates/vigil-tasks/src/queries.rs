//! SQL issued by the built-in steps.
//!
//! Query names double as fixture keys for
//! [`StaticQueryExecutor`](vigil_host::StaticQueryExecutor).

use vigil_host::Query;

pub const LIST_TABLES: Query = Query::fixed(
  "list_tables",
  "SELECT table_name FROM information_schema.tables \
   WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
   ORDER BY table_name",
);

pub const USERS: Query = Query::fixed(
  "users",
  "SELECT id, username, email, active, created_at FROM users",
);

pub const ROLES: Query = Query::fixed("roles", "SELECT id, name FROM roles");

pub const GROUPS: Query = Query::fixed("groups", "SELECT id, name FROM groups");

pub const USER_ROLES: Query = Query::fixed("user_roles", "SELECT user_id, role_id FROM user_roles");

pub const ROLE_PERMISSIONS: Query = Query::fixed(
  "role_permissions",
  "SELECT role_id, permission_id FROM role_permissions",
);

pub const USER_GROUPS: Query = Query::fixed("user_groups", "SELECT group_id, user_id FROM user_groups");

/// `$1`: lower bound (exclusive) on the event timestamp.
pub const AUDIT_EVENTS_SINCE: Query = Query::fixed(
  "audit_events",
  "SELECT user_id, action, ip_address, timestamp FROM audit_logs \
   WHERE timestamp > $1 ORDER BY timestamp",
);

pub const LAST_ACTIVITY: Query = Query::fixed(
  "last_activity",
  "SELECT user_id, MAX(timestamp) AS last_activity FROM audit_logs \
   WHERE user_id IS NOT NULL GROUP BY user_id",
);

/// `$1`: rows strictly older than this are removed. One row per deletion.
pub const DELETE_AUDIT_LOGS: Query = Query::fixed(
  "delete_audit_logs",
  "DELETE FROM audit_logs WHERE timestamp < $1 RETURNING 1 AS deleted",
);

/// Row count of a single table. The caller must validate `table`.
pub(crate) fn count_rows(table: &str) -> Query {
  Query::new(
    format!("count_{}", table),
    format!("SELECT COUNT(*) AS count FROM {}", table),
  )
}

/// Plain SQL identifier: a letter or underscore followed by letters, digits
/// or underscores.
pub fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
