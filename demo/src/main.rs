//! Allocation demo binary
//!
//! Runs one scripted session: five guests, two vans, a rejected move, a
//! blocked confirm, then a successful commit.
//!
//! With `ALLOCATION_API_URL` set, vehicles come from and the allocation is
//! sent to that backend; otherwise in-memory collaborators are used.

mod memory;

use allocation_core::commit::{encode_route_token, CommitService};
use allocation_core::config::SessionConfig;
use allocation_core::environment::{SystemClock, VehicleCatalog};
use allocation_core::session::{SessionAction, SessionEnvironment};
use allocation_core::types::{GroupId, GuestId, Location, RouteId, SessionId, Vehicle};
use allocation_http::{ApiClient, HttpCommitGateway, HttpConfig, HttpVehicleCatalog};
use allocation_runtime::{session_store, SessionStore};
use memory::{ClosedLog, InMemoryCatalog, InMemoryGateway};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EFFECT_TIMEOUT: Duration = Duration::from_secs(10);

fn environment(observer: &ClosedLog) -> anyhow::Result<SessionEnvironment> {
    let config = SessionConfig::from_env()
        .context("reading session configuration")?
        .with_search_debounce(Duration::ZERO);

    let (catalog, gateway): (Arc<dyn VehicleCatalog>, CommitService) =
        if std::env::var_os("ALLOCATION_API_URL").is_some() {
            let http = HttpConfig::from_env().context("reading HTTP configuration")?;
            tracing::info!(base_url = %http.base_url, "Using HTTP backend");
            let client = ApiClient::new(http)?;
            (
                Arc::new(HttpVehicleCatalog::new(client.clone())),
                CommitService::new(Arc::new(HttpCommitGateway::new(client))),
            )
        } else {
            tracing::info!("Using in-memory backend");
            (
                Arc::new(InMemoryCatalog::new(memory::fleet())),
                CommitService::new(Arc::new(InMemoryGateway)),
            )
        };

    Ok(SessionEnvironment::new(
        Arc::new(SystemClock),
        catalog,
        gateway,
        Arc::new(observer.clone()),
        config,
    ))
}

async fn send(store: &SessionStore, action: SessionAction) -> anyhow::Result<()> {
    let name = action.name();
    let mut handle = store.send(action).await?;
    handle
        .wait_with_timeout(EFFECT_TIMEOUT)
        .await
        .with_context(|| format!("waiting for effects of {name}"))?;
    Ok(())
}

async fn move_guest(store: &SessionStore, id: u64, to: GroupId) -> anyhow::Result<()> {
    send(
        store,
        SessionAction::MoveGuest {
            guest_id: GuestId::new(id),
            from: Location::Pool,
            to: Location::Group(to),
            target_index: None,
        },
    )
    .await?;

    if let Some(feedback) = store.state(|s| s.last_feedback.clone()).await {
        println!("  guest {id} → group {to}: rejected ({feedback})");
    } else {
        println!("  guest {id} → group {to}: ok");
    }
    Ok(())
}

async fn pick_vehicle(store: &SessionStore, group: GroupId, seats: u32) -> anyhow::Result<Vehicle> {
    let options = store.state(|s| s.vehicle_options(Some(group))).await;
    options
        .into_iter()
        .filter(|option| option.selectable)
        .map(|option| option.vehicle)
        .find(|vehicle| vehicle.capacity.value() == seats)
        .with_context(|| format!("no selectable vehicle with {seats} seats"))
}

async fn print_allocation(store: &SessionStore) {
    let summary = store
        .state(|s| {
            let mut lines = vec![format!("  pool: {:?}", s.allocation.pool())];
            for group in s.allocation.groups() {
                let vehicle = group
                    .selected_vehicle
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |v| format!("{} ({} seats)", v.number, v.capacity.value()));
                lines.push(format!(
                    "  group {}: {vehicle} {:?}",
                    group.id, group.assigned_guests
                ));
            }
            lines.join("\n")
        })
        .await;
    println!("{summary}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "allocation_demo=info,allocation_core=info,allocation_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    println!("=== Guest Allocation Demo ===\n");

    let observer = ClosedLog::default();
    let store = session_store(environment(&observer)?);

    send(
        &store,
        SessionAction::Open {
            session_id: SessionId::new(),
            guests: memory::guests(5),
            existing_schedules: None,
            route_token: encode_route_token(RouteId::new(42)),
        },
    )
    .await?;
    send(&store, SessionAction::AddGroup).await?;
    let groups: Vec<GroupId> = store
        .state(|s| s.allocation.groups().iter().map(|g| g.id).collect())
        .await;
    let (first, second) = match groups.as_slice() {
        [first, second, ..] => (*first, *second),
        _ => anyhow::bail!("expected two groups, found {}", groups.len()),
    };

    println!(">>> Searching vehicles");
    send(
        &store,
        SessionAction::SearchVehicles {
            term: "van".to_string(),
            status: None,
        },
    )
    .await?;
    let found = store.state(|s| s.search.results.len()).await;
    println!("  {found} vehicles found");

    println!("\n>>> Selecting a 2-seater for group {first} and a 3-seater for group {second}");
    let small = pick_vehicle(&store, first, 2).await?;
    send(&store, SessionAction::SelectVehicle { group_id: first, vehicle: Some(small) }).await?;
    let large = pick_vehicle(&store, second, 3).await?;
    send(&store, SessionAction::SelectVehicle { group_id: second, vehicle: Some(large) }).await?;

    println!("\n>>> Seating guests");
    for id in 1..=3 {
        move_guest(&store, id, first).await?;
    }
    move_guest(&store, 3, second).await?;
    move_guest(&store, 4, second).await?;
    print_allocation(&store).await;

    println!("\n>>> Confirming with a guest still in the pool");
    send(&store, SessionAction::Confirm).await?;
    for reason in store.state(|s| s.blocking_reasons.clone()).await {
        println!("  blocked: {reason}");
    }

    println!("\n>>> Seating the last guest and confirming again");
    move_guest(&store, 5, second).await?;
    send(&store, SessionAction::SetRemarks { remarks: "Airport transfer".to_string() }).await?;
    send(&store, SessionAction::Confirm).await?;
    print_allocation(&store).await;

    let (phase, error) = store.state(|s| (s.phase, s.error_message())).await;
    println!("\n  phase: {phase}");
    if let Some(error) = error {
        println!("  error: {error}");
    }

    send(&store, SessionAction::Close).await?;
    println!("  observer notified: {:?}", observer.notifications());

    store.shutdown_default().await?;
    println!("\n=== Demo complete ===");
    Ok(())
}
