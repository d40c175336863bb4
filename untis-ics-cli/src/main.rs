mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use untis_ics_core::{providers::DEFAULT_TIMEOUT_SECS, window::DEFAULT_WINDOW_MONTHS};

#[derive(Parser)]
#[command(name = "untis-ics")]
#[command(about = "Export a WebUntis timetable as an ICS calendar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the timetable and write an ICS file
    Generate {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output file path
        #[arg(short, long, env = "ICAL_FILE_PATH", default_value = "timetable.ics")]
        output: PathBuf,

        /// Calendar name shown by clients
        #[arg(long, env = "ICAL_CALENDAR_NAME")]
        calendar_name: Option<String>,

        /// Months fetched before and after today
        #[arg(long, default_value_t = DEFAULT_WINDOW_MONTHS)]
        months: u32,
    },

    /// Check that the credentials are accepted
    Validate {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

/// WebUntis connection settings, shared with the server's environment variables
#[derive(Args)]
struct ConnectionArgs {
    /// WebUntis host, e.g. mese.webuntis.com
    #[arg(short, long, env = "WEBUNTIS_SERVER")]
    server: String,

    /// School name as used in the WebUntis login URL
    #[arg(long, env = "WEBUNTIS_SCHOOL")]
    school: String,

    /// Username
    #[arg(short, long, env = "WEBUNTIS_USERNAME")]
    username: String,

    /// Password
    #[arg(short = 'P', long, env = "WEBUNTIS_PASSWORD", hide_env_values = true)]
    password: String,

    /// Client name sent at login
    #[arg(long, env = "WEBUNTIS_CLIENT", default_value = "untis-ics")]
    client: String,

    /// Request timeout in seconds
    #[arg(long, env = "WEBUNTIS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

impl From<ConnectionArgs> for commands::Connection {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            server: args.server,
            school: args.school,
            username: args.username,
            password: args.password,
            client: args.client,
            timeout: args.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("untis_ics_cli={log_level},untis_ics_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Generate {
            connection,
            output,
            calendar_name,
            months,
        } => {
            commands::generate_command(commands::GenerateParams {
                connection: connection.into(),
                output,
                calendar_name,
                months,
            })
            .await
        }

        Commands::Validate { connection } => commands::validate_command(connection.into()).await,
    }
}
