use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rocket::routes;
use tokio::sync::mpsc::unbounded_channel;

mod bot;
use bot::Prolotea;

mod config;
use config::ProloteaConfig;

mod registry;
use registry::FileRegistry;

mod subscriptions;

mod webhooks;
use webhooks::{gitea_webhook, health_check, EventSender};

#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Configuration file for prolotea
    #[clap(short, long, value_parser)]
    config: PathBuf,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Announce a Gitea repository's events in a room, and print how to set up its webhook
    Subscribe {
        /// Matrix room id, e.g. `!abcdef:prologin.org`
        room: String,
        /// Repository full name, e.g. `prologin/site`
        repo: String,
    },
    /// Stop announcing a repository's events in a room
    Unsubscribe { room: String, repo: String },
    /// List the repositories a room is subscribed to
    List { room: String },
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();
    let config_file = File::open(&opts.config)
        .with_context(|| format!("couldn't open {}:", opts.config.display()))?;
    let config: ProloteaConfig = serde_yaml::from_reader(BufReader::new(config_file))
        .context("couldn't parse config file")?;

    let registry = Arc::new(FileRegistry::new(config.subscriptions_path()));

    match opts.command {
        Some(command) => manage_subscriptions(command, &config, registry.as_ref()),
        None => serve(config, registry).await,
    }
}

async fn serve(config: ProloteaConfig, registry: Arc<FileRegistry>) -> anyhow::Result<()> {
    let (sender, receiver) = unbounded_channel();

    let prolotea = Prolotea::new(config, registry).context("failed to create prolotea bot")?;
    prolotea.init().await.context("failed to init prolotea bot")?;
    tokio::spawn(async move { prolotea.run(receiver).await });

    let rocket = rocket::build()
        .mount("/", routes![gitea_webhook, health_check])
        .manage(EventSender(sender));
    rocket
        .launch()
        .await
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!(err))
}

fn manage_subscriptions(
    command: Command,
    config: &ProloteaConfig,
    registry: &FileRegistry,
) -> anyhow::Result<()> {
    match command {
        Command::Subscribe { room, repo } => {
            let token =
                subscriptions::subscribe(registry, &config.webhook_secret, &room, &repo)
                    .with_context(|| format!("couldn't subscribe {} to {}", room, repo))?;
            println!(
                "{}",
                subscriptions::setup_instructions(
                    &config.gitea_url,
                    &config.public_url,
                    &repo,
                    &token
                )
            );
        }
        Command::Unsubscribe { room, repo } => {
            if subscriptions::unsubscribe(registry, &room, &repo)? {
                println!("Unsubscribed {} from {}", room, repo);
            } else {
                println!("{} wasn't subscribed to {}", room, repo);
            }
        }
        Command::List { room } => {
            let repos = subscriptions::list(registry, &room)?;
            if repos.is_empty() {
                println!("{} isn't subscribed to any repository", room);
            }
            for repo in repos {
                println!("{}", repo);
            }
        }
    }

    Ok(())
}
