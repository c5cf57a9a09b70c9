use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, EngineError, MemberActivityKind, MemberListFilter, MemberStatus, RegisterMemberCmd,
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

#[tokio::test]
async fn register_normalizes_and_starts_pending() {
    let (engine, _db) = engine_with_db().await;

    let member = engine
        .register_member(
            RegisterMemberCmd::new("  AGT-201 ", " Rene\u{0301} Wijaya ", "3201030303030003")
                .address("  ")
                .phone(" 0812-3456-7890 "),
        )
        .await
        .unwrap();

    assert_eq!(member.member_number, "AGT-201");
    assert_eq!(member.name, "Ren\u{00e9} Wijaya");
    assert_eq!(member.status, MemberStatus::Pending);
    assert_eq!(member.address, None);
    assert_eq!(member.phone.as_deref(), Some("0812-3456-7890"));
    assert!(engine.member_exists(member.id).await.unwrap());
    assert!(!engine.member_exists(member.id + 1).await.unwrap());
    assert_eq!(engine.member(member.id).await.unwrap(), member);
}

#[tokio::test]
async fn duplicate_member_number_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    engine
        .register_member(RegisterMemberCmd::new("AGT-202", "Dewi", "1"))
        .await
        .unwrap();
    let err = engine
        .register_member(RegisterMemberCmd::new("AGT-202", "Another Dewi", "2"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("AGT-202".to_string()));

    let err = engine
        .register_member(RegisterMemberCmd::new("AGT-203", "  ", "3"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn status_moves_forward_only() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .register_member(RegisterMemberCmd::new("AGT-204", "Agus", "4"))
        .await
        .unwrap()
        .id;

    let verified = engine.verify_member(id).await.unwrap();
    assert_eq!(verified.status, MemberStatus::Verified);

    let err = engine.verify_member(id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let active = engine.activate_member(id).await.unwrap();
    assert_eq!(active.status, MemberStatus::Active);

    let err = engine.verify_member(id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    let err = engine.activate_member(id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let err = engine.activate_member(id + 100).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn status_changes_are_logged_as_activities() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .register_member(RegisterMemberCmd::new("AGT-206", "Wati", "6"))
        .await
        .unwrap()
        .id;

    engine.verify_member(id).await.unwrap();
    engine.verify_member(id).await.unwrap_err();
    engine.activate_member(id).await.unwrap();

    let kinds: Vec<_> = engine
        .member_activities(id)
        .await
        .unwrap()
        .into_iter()
        .map(|activity| {
            assert_eq!(activity.member_id, id);
            activity.kind
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            MemberActivityKind::Registered,
            MemberActivityKind::Verified,
            MemberActivityKind::Activated,
        ]
    );

    engine
        .register_member(RegisterMemberCmd::new("AGT-206", "Dup", "7"))
        .await
        .unwrap_err();
    assert_eq!(engine.member_activities(id).await.unwrap().len(), 3);

    let err = engine.member_activities(id + 100).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn pending_member_can_be_activated_directly() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .register_member(RegisterMemberCmd::new("AGT-205", "Rina", "5"))
        .await
        .unwrap()
        .id;

    let active = engine.activate_member(id).await.unwrap();
    assert_eq!(active.status, MemberStatus::Active);
}

#[tokio::test]
async fn members_are_filtered_and_paged() {
    let (engine, _db) = engine_with_db().await;
    for (number, name) in [
        ("AGT-301", "Siti Rahma"),
        ("AGT-302", "Budi Hartono"),
        ("AGT-303", "Siti Nurhaliza"),
    ] {
        engine
            .register_member(RegisterMemberCmd::new(number, name, number))
            .await
            .unwrap();
    }
    let budi = engine
        .list_members_page(
            &MemberListFilter {
                status: None,
                query: Some("budi".to_string()),
            },
            10,
            None,
        )
        .await
        .unwrap()
        .0;
    assert_eq!(budi.len(), 1);
    engine.verify_member(budi[0].id).await.unwrap();

    let siti = MemberListFilter {
        status: None,
        query: Some("Siti".to_string()),
    };
    let (page, cursor) = engine.list_members_page(&siti, 1, None).await.unwrap();
    assert_eq!(page.len(), 1);
    let (rest, cursor) = engine
        .list_members_page(&siti, 1, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_ne!(page[0].id, rest[0].id);
    assert!(cursor.is_none());

    let verified = MemberListFilter {
        status: Some(MemberStatus::Verified),
        query: None,
    };
    let (page, _) = engine.list_members_page(&verified, 10, None).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].member_number, "AGT-302");
}
