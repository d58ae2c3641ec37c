//! Schema-wide conventions checked against the migrated database.

use sqlx::PgPool;

const MIGRATIONS_TABLE: &str = "_sqlx_migrations";

async fn base_tables(pool: &PgPool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT table_name::TEXT
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != $1
         ORDER BY table_name",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_all(pool)
    .await
    .unwrap()
}

/// Entity ids are BIGINT; only the `roles` lookup uses SMALLINT.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_primary_keys_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name::TEXT, data_type::TEXT
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != $1",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        let expected = if table == "roles" { "smallint" } else { "bigint" };
        assert_eq!(data_type, expected, "{table}.id has type {data_type}");
    }
}

/// Every table carries `created_at`/`updated_at` as timestamptz and a
/// trigger that maintains `updated_at`.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tables_have_maintained_timestamps(pool: PgPool) {
    for table in base_tables(&pool).await {
        for column in ["created_at", "updated_at"] {
            let data_type: Option<String> = sqlx::query_scalar(
                "SELECT data_type::TEXT
                 FROM information_schema.columns
                 WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
            )
            .bind(&table)
            .bind(column)
            .fetch_optional(&pool)
            .await
            .unwrap();
            assert_eq!(
                data_type.as_deref(),
                Some("timestamp with time zone"),
                "{table}.{column} missing or not timestamptz"
            );
        }

        let has_trigger: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.triggers
                WHERE event_object_table = $1 AND action_statement LIKE '%set_updated_at%'
            )",
        )
        .bind(&table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(has_trigger, "{table} has no set_updated_at trigger");
    }
}

/// Money is stored as NUMERIC(19,6), never as floating point.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_no_floating_point_columns(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name::TEXT, column_name::TEXT
         FROM information_schema.columns
         WHERE table_schema = 'public'
           AND data_type IN ('real', 'double precision', 'money', 'character varying')",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert!(rows.is_empty(), "unexpected column types: {rows:?}");

    let (precision, scale): (i32, i32) = sqlx::query_as(
        "SELECT numeric_precision::INT, numeric_scale::INT
         FROM information_schema.columns
         WHERE table_name = 'savings_accounts' AND column_name = 'account_balance'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((precision, scale), (19, 6));
}

/// Every foreign key column has an index of its own.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_foreign_keys_are_indexed(pool: PgPool) {
    let fk_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT tc.table_name::TEXT, kcu.column_name::TEXT
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
         WHERE tc.constraint_type = 'FOREIGN KEY'
           AND tc.table_schema = 'public'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!fk_columns.is_empty());
    for (table, column) in &fk_columns {
        let indexed: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM pg_indexes
                WHERE schemaname = 'public' AND tablename = $1 AND indexdef LIKE $2
            )",
        )
        .bind(table)
        .bind(format!("%({column})%"))
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(indexed, "FK column {table}.{column} has no index");
    }
}

/// Foreign keys state their delete/update behaviour explicitly.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_foreign_keys_declare_rules(pool: PgPool) {
    let rules: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT constraint_name::TEXT, delete_rule::TEXT, update_rule::TEXT
         FROM information_schema.referential_constraints
         WHERE constraint_schema = 'public'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (constraint, delete_rule, update_rule) in &rules {
        assert!(
            delete_rule != "NO ACTION" || update_rule != "NO ACTION",
            "{constraint} relies on the implicit NO ACTION rules"
        );
    }
}

/// Unique constraints are named `uq_*` so the API can map violations to 409.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unique_constraints_use_uq_prefix(pool: PgPool) {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT constraint_name::TEXT
         FROM information_schema.table_constraints
         WHERE constraint_schema = 'public' AND constraint_type = 'UNIQUE'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!names.is_empty());
    for name in &names {
        assert!(name.starts_with("uq_"), "unique constraint {name} lacks uq_ prefix");
    }
}
