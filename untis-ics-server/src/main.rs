mod config;
mod handlers;
mod scheduler;
mod server;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use untis_ics_core::{
    IcsOptions,
    generator::{CalendarGenerator, FeedStore},
    ics::IcsGenerator,
    providers::{Wrapper, webuntis::WebUntisProvider},
};

use crate::{
    config::Config,
    handlers::{AppState, create_app},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "untis_ics_server=info,untis_ics_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().inspect_err(|e| tracing::error!("{}", e))?;

    let provider = WebUntisProvider::new(config.provider.clone(), config.credentials.clone())?;
    let source = Arc::new(Wrapper::new(provider));

    let store = Arc::new(FeedStore::with_file(&config.feed_path));
    match store.load_existing().await {
        Ok(true) => tracing::info!(
            "Serving existing feed from {} until the first update",
            config.feed_path.display()
        ),
        Ok(false) => {}
        Err(e) => tracing::warn!("Ignoring unreadable feed file: {}", e),
    }

    let encoder = IcsGenerator::new(IcsOptions {
        calendar_name: config.calendar_name.clone(),
        ..Default::default()
    });
    let generator = Arc::new(CalendarGenerator::new(source, encoder, store.clone()));

    tracing::info!(
        "Updating every {} minutes; feed available at /{}.ics",
        config.update_interval.as_secs() / 60,
        config.secret_path
    );
    let updates = scheduler::spawn(generator, config.update_interval);

    let app = create_app(AppState { store }, &config.secret_path);
    let result = server::start_server(app, config.port).await;

    updates.abort();
    result
}
