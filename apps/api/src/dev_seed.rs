use qbox_core::{AppError, AppResult};
use qbox_domain::Device;
use qbox_infrastructure::PostgresDeviceRegistry;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

struct SeedQbox {
    id: &'static str,
    qbox_id: &'static str,
    name: &'static str,
    location: &'static str,
    address: &'static str,
}

const DEV_SEED_QBOXES: [SeedQbox; 3] = [
    SeedQbox {
        id: "5b0f8f3c-1d1e-4c59-9a53-0d3c61f1a100",
        qbox_id: "QB-100",
        name: "Harbour Lobby Locker",
        location: "Building A lobby",
        address: "1 Harbour Road, Unit 1",
    },
    SeedQbox {
        id: "5b0f8f3c-1d1e-4c59-9a53-0d3c61f1a200",
        qbox_id: "QB-200",
        name: "Station Parcel Wall",
        location: "Central station, east exit",
        address: "12 Station Square",
    },
    SeedQbox {
        id: "5b0f8f3c-1d1e-4c59-9a53-0d3c61f1a300",
        qbox_id: "QB-300",
        name: "Campus Mailroom",
        location: "Library basement",
        address: "400 University Avenue",
    },
];

pub async fn run(pool: &PgPool) -> AppResult<()> {
    let registry = PostgresDeviceRegistry::new(pool.clone());

    for seed in &DEV_SEED_QBOXES {
        let id = Uuid::parse_str(seed.id).map_err(|error| {
            AppError::Internal(format!("invalid seed id for '{}': {error}", seed.qbox_id))
        })?;
        registry
            .upsert_device(&Device::new(
                id,
                seed.qbox_id,
                seed.name,
                Some(seed.location.to_owned()),
                Some(seed.address.to_owned()),
            ))
            .await?;
        info!(qbox_id = seed.qbox_id, "seeded qbox");
    }

    Ok(())
}
