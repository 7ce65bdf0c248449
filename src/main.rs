use std::{env, io, process, sync::Arc};

use chrono::TimeDelta;
use tokio::{net::TcpListener, signal, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use calendar_feeds::{
    juhe::JuheClient,
    refresh,
    server::{self, AppState},
    AlmanacSubscriber, Config, FeedService, HolidaySubscriber, Subscriptions,
};

mod cli;

fn setup_logging() {
    let filter =
        EnvFilter::try_from_env("LOG").unwrap_or_else(|_| EnvFilter::new("calendar_feeds=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn subscriptions(args: &cli::Args) -> Subscriptions {
    if args.juhe_api_key.is_empty() {
        warn!("JUHE_API_KEY is not set, almanac requests will be rejected upstream");
    }

    let client = match JuheClient::new(&args.juhe_api_key, args.almanac_timeout) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to create almanac client: {err}");
            process::exit(1);
        }
    };

    let client = match &args.juhe_base_url {
        Some(base_url) => client.with_base_url(base_url),
        None => client,
    };

    Subscriptions::builder()
        .add(
            "huangli",
            AlmanacSubscriber::new(client, TimeDelta::days(args.almanac_days.into())),
        )
        .add("holiday", HolidaySubscriber::new())
        .build()
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = cli::parse(env::args().skip(1).collect());
    setup_logging();

    let service = FeedService::new(Config {
        enabled: args.enable_cache,
        ttl: args.cache_ttl,
        window: TimeDelta::days(args.window_days.into()),
    });

    let refresher = refresh::spawn(Arc::clone(&service), args.refresh_interval);

    let state = Arc::new(AppState {
        service,
        subscriptions: subscriptions(&args),
        ttl: Duration::ZERO,
    });

    for (key, subscriber) in state.subscriptions.iter() {
        info!(key, name = subscriber.name(), "Registered subscription");
    }

    let listener = TcpListener::bind(args.address).await?;
    info!("Listening at http://{}", args.address);

    let result = axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    refresher.abort();
    result
}
