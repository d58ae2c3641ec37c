use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    savings_db::health_check(&pool).await.unwrap();

    let roles: Vec<(String,)> = sqlx::query_as("SELECT name FROM roles ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<&str> = roles.iter().map(|(n,)| n.as_str()).collect();
    assert_eq!(names, savings_core::permissions::ALL_ROLES);
}

/// Account numbers come from a sequence and are zero padded.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_account_number_sequence_is_padded(pool: PgPool) {
    let (next,): (String,) =
        sqlx::query_as("SELECT LPAD(nextval('savings_account_no_seq')::TEXT, 9, '0')")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(next.len(), 9);
    assert!(next.starts_with("00000000"));
}
