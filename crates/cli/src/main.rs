use std::sync::Arc;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "perch")]
#[command(about = "Subscription polling and delivery daemon", long_about = None)]
struct Cli {
    /// Path to the deployment config file
    #[arg(short, long, default_value = "perch.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon (default)
    Run,
    /// Print the configured subscriptions and exit
    List,
    /// Add a subscription from a JSON file
    Add {
        /// Path to a subscription JSON document
        file: String,
    },
    /// Delete a subscription by name
    Delete {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = server::Config::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => server::run(config).await,
        Command::List => {
            let subscriptions = server::load_subscriptions(&config.data_path);
            if subscriptions.is_empty() {
                println!("no subscriptions configured");
                return Ok(());
            }
            for sub in subscriptions {
                let state = if sub.enable { "enabled" } else { "disabled" };
                println!(
                    "{:<24} {:<16} {:?} [{}]",
                    sub.name,
                    sub.cron,
                    sub.spider.kind(),
                    state
                );
            }
            Ok(())
        }
        Command::Add { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let subscription: domain::Subscription = serde_json::from_str(&raw)?;
            let name = subscription.name.clone();
            registry(&config)?.add(subscription).await?;
            println!("added '{name}'");
            Ok(())
        }
        Command::Delete { name } => {
            registry(&config)?.delete(&name).await?;
            println!("deleted '{name}'");
            Ok(())
        }
    }
}

/// One-shot registry for console mutations. The file is the source of
/// truth; a running daemon picks changes up on restart.
fn registry(
    config: &server::Config,
) -> Result<server::SubscriptionRegistry, Box<dyn std::error::Error>> {
    struct Noop;

    #[async_trait::async_trait]
    impl server::TickRunner for Noop {
        async fn run_tick(
            &self,
            _subscription: &domain::Subscription,
        ) -> server::scheduler::TickResult {
            Ok(())
        }
    }

    let scheduler = server::SchedulerHandle::spawn(Arc::new(Noop));
    Ok(server::SubscriptionRegistry::new(&config.data_path, scheduler)?)
}
