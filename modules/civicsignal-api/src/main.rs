use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use civicsignal_api::{routes, ApiDeps};
use civicsignal_common::Config;
use civicsignal_core::classify::Classifier;
use civicsignal_core::events::EventBus;
use civicsignal_core::lifecycle::LifecycleEngine;
use civicsignal_core::notification::Channel;
use civicsignal_core::notify::{
    ChannelProvider, Dispatcher, NoopProvider, PushGateway, Scheduler, SmsGateway,
    TemplateRegistry,
};
use civicsignal_core::store::{PgIssueStore, PgNotificationStore};
use civicsignal_core::transcribe::FixedTranscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting civicsignal-api");

    let config = Config::from_env();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    let issues = Arc::new(PgIssueStore::new(pool.clone()));
    let notifications = Arc::new(PgNotificationStore::new(pool));
    let events = EventBus::new();

    // Channels without a configured gateway deliver as no-ops in development;
    // in_app is always local.
    let mut providers: Vec<Arc<dyn ChannelProvider>> =
        vec![Arc::new(NoopProvider::new(Channel::InApp))];
    match &config.push_gateway_url {
        Some(url) => providers.push(Arc::new(PushGateway::new(url.clone()))),
        None => {
            tracing::warn!("PUSH_GATEWAY_URL not set, push deliveries are no-ops");
            providers.push(Arc::new(NoopProvider::new(Channel::Push)));
        }
    }
    match &config.sms_gateway_url {
        Some(url) => providers.push(Arc::new(SmsGateway::new(
            url.clone(),
            config.sms_sender_id.clone(),
        ))),
        None => {
            tracing::warn!("SMS_GATEWAY_URL not set, sms deliveries are no-ops");
            providers.push(Arc::new(NoopProvider::new(Channel::Sms)));
        }
    }

    let dispatcher = Arc::new(Dispatcher::new(
        notifications.clone(),
        providers,
        TemplateRegistry::with_fallback(config.default_language),
        events.clone(),
    ));

    let scheduler = Scheduler::new(
        notifications.clone(),
        dispatcher.clone(),
        Duration::from_secs(config.scheduler_interval_secs),
    );
    tokio::spawn(scheduler.run());
    tracing::info!(
        interval_secs = config.scheduler_interval_secs,
        "Notification scheduler started"
    );

    let engine = Arc::new(LifecycleEngine::new(
        issues,
        Classifier::default(),
        dispatcher.clone(),
        // No speech recognizer wired yet; voice reports carry a placeholder
        // transcript until one is configured.
        Arc::new(FixedTranscriber::new("(voice transcription unavailable)")),
        events,
    ));

    let deps = Arc::new(ApiDeps { engine, dispatcher, notifications });
    let app = routes::build_router(deps);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    tracing::info!(addr = %addr, "GraphQL API listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
