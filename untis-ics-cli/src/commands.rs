use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use untis_ics_core::{
    Credentials, IcsOptions, ProviderConfig,
    generator::{CalendarGenerator, FeedStore},
    ics::IcsGenerator,
    providers::{LessonSource, Wrapper, webuntis::WebUntisProvider},
};

/// WebUntis login settings
pub struct Connection {
    pub server: String,
    pub school: String,
    pub username: String,
    pub password: String,
    pub client: String,
    pub timeout: u64,
}

impl Connection {
    fn into_source(self) -> Result<Wrapper<WebUntisProvider>> {
        let provider = WebUntisProvider::new(
            ProviderConfig {
                server: self.server,
                school: self.school,
                client_name: self.client,
                timeout: Some(self.timeout),
            },
            Credentials {
                username: self.username,
                password: self.password,
            },
        )?;
        Ok(Wrapper::new(provider))
    }
}

/// Parameters of the generate command
pub struct GenerateParams {
    pub connection: Connection,
    pub output: PathBuf,
    pub calendar_name: Option<String>,
    pub months: u32,
}

/// Run one generation cycle and write the feed to `output`
pub async fn generate_command(params: GenerateParams) -> Result<()> {
    tracing::info!(
        "Generating timetable for {} at {}",
        params.connection.username,
        params.connection.server
    );

    let source = Arc::new(params.connection.into_source()?);
    let encoder = IcsGenerator::new(IcsOptions {
        calendar_name: params.calendar_name,
        ..Default::default()
    });
    let store = Arc::new(FeedStore::with_file(&params.output));
    let generator =
        CalendarGenerator::new(source, encoder, store).with_window_months(params.months);

    let report = generator.generate().await?;

    println!("✓ Fetched {} lessons", report.lessons);
    println!("✓ Wrote {} events to {}", report.events, params.output.display());

    Ok(())
}

/// Log in and out once
pub async fn validate_command(connection: Connection) -> Result<()> {
    tracing::info!(
        "Validating credentials for {} at {}",
        connection.username,
        connection.server
    );

    let source = connection.into_source()?;

    println!("Validating credentials...");
    source.validate().await?;
    println!("✓ Credentials accepted");

    Ok(())
}
