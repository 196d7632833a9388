//! Fetch job scheduling and relay
//!
//! This module handles:
//! - Refreshing the route table from the registry on its interval
//! - Starting a fetch job per tracked race and cancelling jobs whose
//!   race disappeared from the routes
//! - Decoding fetched payloads and relaying the newest fix per routed
//!   vehicle, deduplicated by timestamp

use crate::config::Config;
use crate::feed::FeedClient;
use crate::registry::{RegistryClient, RouteTable};
use crate::relay::{OsmandSink, Sink};
use crate::state::AppState;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tb_core::{Fix, Payload};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Main bridge loop: refresh routes, reconcile fetch jobs, repeat.
pub async fn run(state: AppState, config: Config) {
    let registry = match RegistryClient::new(
        config.registry_url.clone(),
        config.registry_user.clone(),
        config.registry_password.clone(),
        &config.route_keyword,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("cannot start registry client: {e:#}");
            return;
        }
    };
    let feed = Arc::new(FeedClient::new(config.feed_url.clone()));
    let sink: Arc<dyn Sink> = Arc::new(OsmandSink::new(config.ingest_url.clone()));
    let mut jobs: HashMap<String, CancellationToken> = HashMap::new();

    info!("route discovery started");
    loop {
        match registry.fetch_routes().await {
            Ok(routes) => {
                reconcile_jobs(&mut jobs, &routes, &state, &feed, &sink, config.feed_interval);
                *state.routes.write().await = routes;
            }
            Err(e) => warn!("registry poll failed: {e:#}"),
        }
        sleep(config.registry_interval).await;
    }
}

/// Cancel jobs for races no longer routed, start jobs for new races.
fn reconcile_jobs(
    jobs: &mut HashMap<String, CancellationToken>,
    routes: &RouteTable,
    state: &AppState,
    feed: &Arc<FeedClient>,
    sink: &Arc<dyn Sink>,
    interval: Duration,
) {
    jobs.retain(|race, cancel| {
        if routes.contains_key(race) {
            true
        } else {
            info!("fetch job removed: {race}");
            cancel.cancel();
            false
        }
    });

    for race in routes.keys() {
        if !jobs.contains_key(race) {
            info!("fetch job added: {race}");
            let cancel = CancellationToken::new();
            tokio::spawn(fetch_job(
                race.clone(),
                state.clone(),
                Arc::clone(feed),
                Arc::clone(sink),
                interval,
                cancel.clone(),
            ));
            jobs.insert(race.clone(), cancel);
        }
    }
}

/// One fetch job: fetch, decode, and relay on a fixed interval until
/// cancelled.
async fn fetch_job(
    race: String,
    state: AppState,
    feed: Arc<FeedClient>,
    sink: Arc<dyn Sink>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        if let Err(e) = fetch_cycle(&race, &state, &feed, sink.as_ref()).await {
            warn!("fetch cycle for {race} failed: {e:#}");
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }
    debug!("fetch job for {race} stopped");
}

async fn fetch_cycle(
    race: &str,
    state: &AppState,
    feed: &FeedClient,
    sink: &dyn Sink,
) -> Result<()> {
    debug!("fetching positions for {race}");
    let bytes = feed.fetch_latest(race).await?;
    let payload = tb_decoder::decode(&bytes)
        .with_context(|| format!("malformed feed payload for {race}"))?;

    let vehicles = {
        let routes = state.routes.read().await;
        routes.get(race).cloned().unwrap_or_default()
    };
    relay_payload(race, &payload, &vehicles, state, sink).await;
    Ok(())
}

/// Relay the newest moment of every routed vehicle in one payload.
///
/// A vehicle is skipped when it is absent from the payload, has no
/// moments, or its newest timestamp repeats the last relayed one.
pub async fn relay_payload(
    race: &str,
    payload: &Payload,
    vehicles: &HashMap<String, Vec<String>>,
    state: &AppState,
    sink: &dyn Sink,
) {
    for (vehicle_key, device_ids) in vehicles {
        let Ok(vehicle_id) = vehicle_key.parse::<u16>() else {
            warn!("route for {race} has a non-numeric vehicle key {vehicle_key:?}");
            continue;
        };
        let Some(track) = payload.tracks.iter().find(|t| t.vehicle_id == vehicle_id) else {
            continue;
        };
        let Some(moment) = track.latest() else {
            continue;
        };

        if !state.mark_seen(race, vehicle_key, moment.at).await {
            debug!("duplicate timestamp for {race} {vehicle_key}: {}", moment.at);
            continue;
        }

        let fix = Fix::from_moment(moment);
        for device_id in device_ids {
            if let Err(e) = sink.send(device_id, &fix) {
                warn!("sink rejected fix for {device_id}: {e:#}");
            }
        }
    }
}
