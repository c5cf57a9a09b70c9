use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Engine, EngineError, MovementCmd, MovementKind, MovementListFilter, RegisterMemberCmd,
    SavingsCategory,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_file_db(name: &str) -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let path = root.join(format!("engine_{name}_{}_{nanos}.db", std::process::id()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    (engine, db, path)
}

async fn register(engine: &Engine, number: &str) -> i64 {
    engine
        .register_member(RegisterMemberCmd::new(number, "Siti Aminah", "3201010101010001"))
        .await
        .unwrap()
        .id
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

async fn movement_count(db: &DatabaseConnection) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM savings_movements",
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

#[tokio::test]
async fn deposits_and_withdrawals_chain_balances() {
    let (engine, _db) = engine_with_db().await;
    let member_id = register(&engine, "AGT-001").await;

    let steps = [
        (MovementKind::Deposit, 1_000),
        (MovementKind::Deposit, 250),
        (MovementKind::Withdrawal, 700),
        (MovementKind::Deposit, 50),
        (MovementKind::Withdrawal, 600),
    ];

    let mut expected = 0;
    for (minute, (kind, amount)) in (0_i64..).zip(steps) {
        let cmd = MovementCmd::new(member_id, SavingsCategory::Voluntary, kind, amount)
            .occurred_at(at(minute));
        let movement = engine.record_movement(cmd).await.unwrap();

        expected = match kind {
            MovementKind::Deposit => expected + amount,
            MovementKind::Withdrawal => expected - amount,
        };
        assert_eq!(movement.balance_after_minor, expected);
        assert!(movement.balance_after_minor >= 0);
    }

    let balances = engine.savings_balances(member_id).await.unwrap();
    assert_eq!(balances.voluntary_minor, 0);
    assert_eq!(balances.mandatory_minor, 0);
    assert_eq!(balances.special_minor, 0);
    assert_eq!(expected, 1_000 + 250 - 700 + 50 - 600);
}

#[tokio::test]
async fn categories_are_independent_accounts() {
    let (engine, _db) = engine_with_db().await;
    let member_id = register(&engine, "AGT-002").await;

    engine
        .deposit(member_id, SavingsCategory::Mandatory, 100_000, None)
        .await
        .unwrap();
    engine
        .deposit(member_id, SavingsCategory::Special, 5_000, None)
        .await
        .unwrap();

    let err = engine
        .withdraw(member_id, SavingsCategory::Voluntary, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));

    let balances = engine.savings_balances(member_id).await.unwrap();
    assert_eq!(balances.mandatory_minor, 100_000);
    assert_eq!(balances.voluntary_minor, 0);
    assert_eq!(balances.special_minor, 5_000);
    assert_eq!(balances.total_minor(), 105_000);
}

#[tokio::test]
async fn over_withdrawal_appends_nothing() {
    let (engine, db) = engine_with_db().await;
    let member_id = register(&engine, "AGT-003").await;

    engine
        .deposit(member_id, SavingsCategory::Voluntary, 500, Some(at(0)))
        .await
        .unwrap();
    let before = movement_count(&db).await;

    let err = engine
        .withdraw(member_id, SavingsCategory::Voluntary, 501, Some(at(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));
    assert!(!err.is_retryable());

    assert_eq!(movement_count(&db).await, before);
    let balances = engine.savings_balances(member_id).await.unwrap();
    assert_eq!(balances.voluntary_minor, 500);
}

#[tokio::test]
async fn invalid_movements_are_rejected() {
    let (engine, db) = engine_with_db().await;
    let member_id = register(&engine, "AGT-004").await;

    let err = engine
        .deposit(member_id, SavingsCategory::Voluntary, 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine
        .deposit(member_id, SavingsCategory::Voluntary, -10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine
        .deposit(9_999, SavingsCategory::Voluntary, 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    assert!(SavingsCategory::try_from("pension").is_err());
    assert_eq!(movement_count(&db).await, 0);
}

#[tokio::test]
async fn backdated_movement_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let member_id = register(&engine, "AGT-005").await;

    engine
        .deposit(member_id, SavingsCategory::Voluntary, 1_000, Some(at(10)))
        .await
        .unwrap();
    let err = engine
        .deposit(member_id, SavingsCategory::Voluntary, 1_000, Some(at(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    assert_eq!(movement_count(&db).await, 1);
    let balances = engine.savings_balances(member_id).await.unwrap();
    assert_eq!(balances.voluntary_minor, 1_000);

    // Other accounts keep their own ordering.
    engine
        .deposit(member_id, SavingsCategory::Special, 10, Some(at(5)))
        .await
        .unwrap();
}

#[tokio::test]
async fn balances_of_unknown_member_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let err = engine.savings_balances(42).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("member 42".to_string()));
}

#[tokio::test]
async fn movements_are_paged_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let alice = register(&engine, "AGT-006").await;
    let bob = register(&engine, "AGT-007").await;

    for minute in 0..5 {
        engine
            .deposit(alice, SavingsCategory::Voluntary, 100 + minute, Some(at(minute)))
            .await
            .unwrap();
    }
    engine
        .deposit(bob, SavingsCategory::Voluntary, 1, Some(at(0)))
        .await
        .unwrap();
    engine
        .deposit(alice, SavingsCategory::Mandatory, 1, Some(at(0)))
        .await
        .unwrap();

    let filter = MovementListFilter {
        member_id: Some(alice),
        category: Some(SavingsCategory::Voluntary),
    };

    let (page1, cursor) = engine.list_movements_page(filter, 2, None).await.unwrap();
    assert_eq!(
        page1.iter().map(|m| m.amount_minor).collect::<Vec<_>>(),
        vec![104, 103]
    );
    let cursor = cursor.unwrap();

    let (page2, cursor) = engine
        .list_movements_page(filter, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(
        page2.iter().map(|m| m.amount_minor).collect::<Vec<_>>(),
        vec![102, 101]
    );

    let (page3, cursor) = engine
        .list_movements_page(filter, 2, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(
        page3.iter().map(|m| m.amount_minor).collect::<Vec<_>>(),
        vec![100]
    );
    assert!(cursor.is_none());

    let (all, _) = engine
        .list_movements_page(MovementListFilter::default(), 100, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 7);

    let err = engine
        .list_movements_page(filter, 2, Some("bogus"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn recompute_repairs_balance_and_detects_broken_chain() {
    let (engine, db) = engine_with_db().await;
    let member_id = register(&engine, "AGT-008").await;
    let backend = db.get_database_backend();

    engine
        .deposit(member_id, SavingsCategory::Voluntary, 1_000, Some(at(0)))
        .await
        .unwrap();
    let last = engine
        .withdraw(member_id, SavingsCategory::Voluntary, 300, Some(at(1)))
        .await
        .unwrap();

    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE savings_balances SET balance_minor = ? WHERE member_id = ?",
        vec![5_i64.into(), member_id.into()],
    ))
    .await
    .unwrap();

    // A drifted balance row blocks new movements until it is repaired.
    let err = engine
        .deposit(member_id, SavingsCategory::Voluntary, 1, Some(at(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let repaired = engine
        .recompute_savings_balance(member_id, SavingsCategory::Voluntary)
        .await
        .unwrap();
    assert_eq!(repaired, 700);
    assert_eq!(
        engine.savings_balances(member_id).await.unwrap().voluntary_minor,
        700
    );

    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE savings_movements SET balance_after_minor = ? WHERE id = ?",
        vec![999_i64.into(), last.id.into()],
    ))
    .await
    .unwrap();

    let err = engine
        .recompute_savings_balance(member_id, SavingsCategory::Voluntary)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert_eq!(
        engine.savings_balances(member_id).await.unwrap().voluntary_minor,
        700
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_withdrawals_never_overdraw() {
    let (engine, _db, path) = engine_with_file_db("concurrent_withdrawals").await;
    let engine = Arc::new(engine);
    let member_id = register(&engine, "AGT-009").await;

    engine
        .deposit(member_id, SavingsCategory::Voluntary, 1_000, Some(at(0)))
        .await
        .unwrap();

    let spawn_withdrawal = |engine: Arc<Engine>| {
        tokio::spawn(async move {
            engine
                .withdraw(member_id, SavingsCategory::Voluntary, 600, Some(at(1)))
                .await
        })
    };
    let first = spawn_withdrawal(Arc::clone(&engine));
    let second = spawn_withdrawal(Arc::clone(&engine));
    let results = [first.await.unwrap(), second.await.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(EngineError::InsufficientBalance(_)))));

    let balances = engine.savings_balances(member_id).await.unwrap();
    assert_eq!(balances.voluntary_minor, 400);

    let (movements, _) = engine
        .list_movements_page(
            MovementListFilter {
                member_id: Some(member_id),
                category: Some(SavingsCategory::Voluntary),
            },
            10,
            None,
        )
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].balance_after_minor, 400);

    drop(engine);
    let _ = std::fs::remove_file(path);
}
