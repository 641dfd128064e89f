use std::sync::Arc;

use chrono::{Duration, Utc};
use qbox_application::{
    AccessGrantQuery, AccessGrantRepository, ConsumeRecordOutcome, NewAccessGrantRecord,
    RenderedQrCode,
};
use qbox_core::AppError;
use qbox_domain::{
    AccessEvent, AccessGrant, AccessGrantUpdate, AccessMethod, Device, DurationType,
    GrantDuration, NewAccessGrant,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresAccessGrantRepository;
use crate::PostgresDeviceRegistry;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres access grant tests: {error}");
    }

    Some(pool)
}

async fn ensure_device(pool: &PgPool) -> String {
    let qbox_id = format!("QB-TEST-{}", Uuid::new_v4().simple());
    let device = Device::new(
        Uuid::new_v4(),
        qbox_id.as_str(),
        "Test locker",
        Some("Test hall".to_owned()),
        None,
    );
    let upsert = PostgresDeviceRegistry::new(pool.clone())
        .upsert_device(&device)
        .await;
    assert!(upsert.is_ok());

    qbox_id
}

async fn create_grant(
    repository: &PostgresAccessGrantRepository,
    qbox_id: &str,
    max_users: u32,
) -> AccessGrant {
    let Ok(duration) = GrantDuration::new(DurationType::Days, 1) else {
        panic!("valid duration rejected");
    };
    let grant = match AccessGrant::issue(
        NewAccessGrant {
            qbox_id: qbox_id.to_owned(),
            created_by: Some("tester".to_owned()),
            name: "Repository test grant".to_owned(),
            location: Some("Test hall".to_owned()),
            address: None,
            max_users,
            duration,
        },
        Utc::now(),
    ) {
        Ok(grant) => grant,
        Err(error) => panic!("failed to issue grant: {error}"),
    };

    let created = repository
        .create_grant(NewAccessGrantRecord {
            grant: grant.clone(),
            token_hash: Uuid::new_v4().simple().to_string(),
            token_ciphertext: vec![1, 2, 3],
        })
        .await;
    assert!(created.is_ok());

    grant
}

fn event_for(grant: &AccessGrant, user_identifier: &str) -> AccessEvent {
    AccessEvent {
        id: Uuid::new_v4(),
        grant_id: grant.id(),
        user_identifier: user_identifier.to_owned(),
        user_name: None,
        accessed_at: Utc::now(),
        access_method: AccessMethod::QrCode,
    }
}

#[tokio::test]
async fn create_grant_for_unknown_device_is_not_found() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool);
    let Ok(duration) = GrantDuration::new(DurationType::Minutes, 30) else {
        panic!("valid duration rejected");
    };
    let Ok(grant) = AccessGrant::issue(
        NewAccessGrant {
            qbox_id: "QB-DOES-NOT-EXIST".to_owned(),
            created_by: None,
            name: "Orphan".to_owned(),
            location: None,
            address: None,
            max_users: 1,
            duration,
        },
        Utc::now(),
    ) else {
        panic!("valid grant rejected");
    };

    let created = repository
        .create_grant(NewAccessGrantRecord {
            grant,
            token_hash: Uuid::new_v4().simple().to_string(),
            token_ciphertext: vec![0],
        })
        .await;
    assert!(matches!(created, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn consume_records_event_once_per_user() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool.clone());
    let qbox_id = ensure_device(&pool).await;
    let grant = create_grant(&repository, &qbox_id, 2).await;

    let first = repository
        .consume_grant(event_for(&grant, "alice@example.com"))
        .await;
    assert!(matches!(
        first,
        Ok(ConsumeRecordOutcome::Consumed { ref grant, .. }) if grant.current_users() == 1
    ));

    let replay = repository
        .consume_grant(event_for(&grant, "alice@example.com"))
        .await;
    assert!(matches!(replay, Ok(ConsumeRecordOutcome::AlreadyRecorded)));

    let stored = repository.find_grant(grant.id()).await;
    assert!(matches!(stored, Ok(Some(ref stored)) if stored.current_users() == 1));

    let events = repository.list_access_events(grant.id()).await;
    assert_eq!(events.map(|events| events.len()).ok(), Some(1));
}

#[tokio::test]
async fn consume_refuses_revoked_and_full_grants() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool.clone());
    let qbox_id = ensure_device(&pool).await;

    let full = create_grant(&repository, &qbox_id, 1).await;
    assert!(repository.consume_grant(event_for(&full, "alice")).await.is_ok());
    let bob = repository.consume_grant(event_for(&full, "bob")).await;
    assert!(matches!(bob, Ok(ConsumeRecordOutcome::Unavailable)));

    let revoked = create_grant(&repository, &qbox_id, 5).await;
    assert!(matches!(repository.revoke_grant(revoked.id()).await, Ok(true)));
    assert!(matches!(repository.revoke_grant(revoked.id()).await, Ok(true)));
    let carol = repository.consume_grant(event_for(&revoked, "carol")).await;
    assert!(matches!(carol, Ok(ConsumeRecordOutcome::Unavailable)));

    let expired = create_grant(&repository, &qbox_id, 5).await;
    let mut late = event_for(&expired, "dave");
    late.accessed_at = expired.expires_at() + Duration::seconds(1);
    let dave = repository.consume_grant(late).await;
    assert!(matches!(dave, Ok(ConsumeRecordOutcome::Unavailable)));
}

#[tokio::test]
async fn concurrent_consumes_stop_at_capacity() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = Arc::new(PostgresAccessGrantRepository::new(pool.clone()));
    let qbox_id = ensure_device(&pool).await;
    let grant = create_grant(&repository, &qbox_id, 3).await;

    let mut handles = Vec::new();
    for index in 0..10 {
        let repository = repository.clone();
        let event = event_for(&grant, &format!("user-{index}"));
        handles.push(tokio::spawn(
            async move { repository.consume_grant(event).await },
        ));
    }

    let mut consumed = 0;
    let mut unavailable = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(ConsumeRecordOutcome::Consumed { .. })) => consumed += 1,
            Ok(Ok(ConsumeRecordOutcome::Unavailable)) => unavailable += 1,
            other => panic!("unexpected consume result: {other:?}"),
        }
    }

    assert_eq!(consumed, 3);
    assert_eq!(unavailable, 7);
    let stored = repository.find_grant(grant.id()).await;
    assert!(matches!(stored, Ok(Some(ref stored)) if stored.current_users() == 3));
}

#[tokio::test]
async fn save_grant_keeps_usage_and_rejects_shrinking_below_it() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool.clone());
    let qbox_id = ensure_device(&pool).await;
    let grant = create_grant(&repository, &qbox_id, 3).await;
    for user in ["erin", "frank"] {
        assert!(repository.consume_grant(event_for(&grant, user)).await.is_ok());
    }

    // The in-process copy still says zero users; storage must keep its own counter.
    let mut renamed = grant.clone();
    assert!(
        renamed
            .apply_update(
                AccessGrantUpdate {
                    name: Some("Renamed".to_owned()),
                    ..AccessGrantUpdate::default()
                },
                Utc::now(),
            )
            .is_ok()
    );
    assert!(repository.save_grant(&renamed, None).await.is_ok());
    let stored = repository.find_grant(grant.id()).await;
    assert!(matches!(
        stored,
        Ok(Some(ref stored)) if stored.current_users() == 2 && stored.name() == "Renamed"
    ));

    let mut shrunk = grant.clone();
    assert!(
        shrunk
            .apply_update(
                AccessGrantUpdate {
                    max_users: Some(1),
                    ..AccessGrantUpdate::default()
                },
                Utc::now(),
            )
            .is_ok()
    );
    let saved = repository.save_grant(&shrunk, None).await;
    assert!(matches!(saved, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn delete_cascades_events_and_qr_image() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool.clone());
    let qbox_id = ensure_device(&pool).await;
    let grant = create_grant(&repository, &qbox_id, 3).await;
    assert!(repository.consume_grant(event_for(&grant, "gina")).await.is_ok());
    assert!(
        repository
            .store_qr_code(
                grant.id(),
                &RenderedQrCode {
                    content_type: "image/svg+xml".to_owned(),
                    bytes: b"<svg/>".to_vec(),
                },
            )
            .await
            .is_ok()
    );
    assert!(matches!(repository.find_qr_code(grant.id()).await, Ok(Some(_))));

    assert!(matches!(repository.delete_grant(grant.id()).await, Ok(true)));
    assert!(matches!(repository.delete_grant(grant.id()).await, Ok(false)));

    let orphaned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM access_grant_events WHERE grant_id = $1",
    )
    .bind(grant.id().as_uuid())
    .fetch_one(&pool)
    .await;
    assert_eq!(orphaned.ok(), Some(0));
}

#[tokio::test]
async fn list_grants_filters_by_device_and_activity() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool.clone());
    let qbox_id = ensure_device(&pool).await;
    let active = create_grant(&repository, &qbox_id, 3).await;
    let revoked = create_grant(&repository, &qbox_id, 3).await;
    assert!(repository.revoke_grant(revoked.id()).await.is_ok());

    let all = repository
        .list_grants(AccessGrantQuery {
            qbox_id: Some(qbox_id.clone()),
            active_only: false,
            limit: 50,
            offset: 0,
        })
        .await;
    assert_eq!(all.map(|grants| grants.len()).ok(), Some(2));

    let active_only = repository
        .list_grants(AccessGrantQuery {
            qbox_id: Some(qbox_id),
            active_only: true,
            limit: 50,
            offset: 0,
        })
        .await;
    let ids = active_only
        .map(|grants| grants.iter().map(AccessGrant::id).collect::<Vec<_>>())
        .unwrap_or_default();
    assert_eq!(ids, vec![active.id()]);
}

#[tokio::test]
async fn save_grant_does_not_undo_a_later_revoke() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessGrantRepository::new(pool.clone());
    let qbox_id = ensure_device(&pool).await;
    let grant = create_grant(&repository, &qbox_id, 3).await;

    let Ok(Some(mut loaded)) = repository.find_grant(grant.id()).await else {
        panic!("grant should be stored");
    };
    assert!(matches!(repository.revoke_grant(grant.id()).await, Ok(true)));

    assert!(
        loaded
            .apply_update(
                AccessGrantUpdate {
                    name: Some("Renamed after revoke".to_owned()),
                    ..AccessGrantUpdate::default()
                },
                Utc::now(),
            )
            .is_ok()
    );
    assert!(repository.save_grant(&loaded, None).await.is_ok());

    let stored = repository.find_grant(grant.id()).await;
    assert!(matches!(
        stored,
        Ok(Some(ref stored)) if !stored.is_active() && stored.name() == "Renamed after revoke"
    ));
    let refused = repository.consume_grant(event_for(&grant, "ivan")).await;
    assert!(matches!(refused, Ok(ConsumeRecordOutcome::Unavailable)));

    assert!(repository.save_grant(&loaded, Some(true)).await.is_ok());
    let stored = repository.find_grant(grant.id()).await;
    assert!(matches!(stored, Ok(Some(ref stored)) if stored.is_active()));
}

#[tokio::test]
async fn concurrent_consumes_by_one_user_record_a_single_event() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = Arc::new(PostgresAccessGrantRepository::new(pool.clone()));
    let qbox_id = ensure_device(&pool).await;
    let grant = create_grant(&repository, &qbox_id, 5).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let repository = repository.clone();
        let event = event_for(&grant, "jules@example.com");
        handles.push(tokio::spawn(
            async move { repository.consume_grant(event).await },
        ));
    }

    let mut consumed = 0;
    let mut already_recorded = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(ConsumeRecordOutcome::Consumed { .. })) => consumed += 1,
            Ok(Ok(ConsumeRecordOutcome::AlreadyRecorded)) => already_recorded += 1,
            other => panic!("unexpected consume result: {other:?}"),
        }
    }

    assert_eq!(consumed, 1);
    assert_eq!(already_recorded, 3);
    let stored = repository.find_grant(grant.id()).await;
    assert!(matches!(stored, Ok(Some(ref stored)) if stored.current_users() == 1));
    let events = repository.list_access_events(grant.id()).await;
    assert_eq!(events.map(|events| events.len()).ok(), Some(1));
}
