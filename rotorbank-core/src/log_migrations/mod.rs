//! Event log migrations, embedded SQL files
//!
//! Each migration is a (name, sql) pair compiled in with include_str! and
//! applied in order by the logging service.

/// All event log migrations in application order.
///
/// New migrations are added as `NNN_description.sql` and listed here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
