use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use deck_core::{
    bootstrap::{BootstrapProvider, StaticBootstrap},
    identity::{resolve_client_id, EnvIdentity, FixedIdentity, IdentityProvider},
    preferences::{AppSettings, FilePreferenceStore},
    session_sync::{MissingSessionStore, SessionStore},
    supply::{CardSource, MissingCardSource},
    transport::{HttpCardSource, HttpSessionStore},
    EngineConfig, SwipeDeck,
};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::info;

mod commands;
mod config;
mod runner;

use commands::{parse_script, Command};
use config::{load_cli_settings, CliSettings, FlagOverrides};
use runner::{Flow, Runner};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    client_id: Option<String>,
    /// Run without the card generator and session store.
    #[arg(long)]
    offline: bool,
    /// Comma separated commands, e.g. `r,l,y,c,n`. Reads stdin when absent.
    #[arg(long)]
    swipes: Option<String>,
    #[arg(long)]
    restart: bool,
    #[arg(long)]
    toggle_dark: bool,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let settings = load_cli_settings(
        args.config.as_deref(),
        &FlagOverrides {
            server_url: args.server_url.clone(),
            client_id: args.client_id.clone(),
            offline: args.offline,
        },
    );
    let deck = build_deck(&settings)?;
    let source = deck.load().await;
    info!(client_id = %deck.client_id(), ?source, "cli: deck ready");

    let preferences = AppSettings::load(Box::new(FilePreferenceStore::new(
        settings.preferences_path.clone(),
    )));
    let runner = Runner::new(deck, preferences);

    if args.restart {
        runner.execute(Command::Restart).await?;
    }
    if args.toggle_dark {
        runner.execute(Command::ToggleDark).await?;
    }
    println!("{}", runner.show().await);

    match args.swipes {
        Some(script) => {
            for command in parse_script(&script)? {
                if runner.execute(command).await? == Flow::Quit {
                    break;
                }
                println!("{}", runner.show().await);
            }
        }
        None => {
            let mut lines = BufReader::new(stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = Command::parse(&line) else {
                    println!("unknown command {:?}; try r, l, y, n, c, restart, dark, show or q", line.trim());
                    continue;
                };
                if runner.execute(command).await? == Flow::Quit {
                    break;
                }
                println!("{}", runner.show().await);
            }
        }
    }

    runner.flush().await;
    Ok(())
}

fn build_deck(settings: &CliSettings) -> Result<Arc<SwipeDeck>> {
    let identity: Box<dyn IdentityProvider> = match &settings.client_id {
        Some(id) => Box::new(FixedIdentity(Some(id.clone()))),
        None => Box::new(EnvIdentity::default()),
    };
    let client_id = resolve_client_id(identity.as_ref());

    let bootstrap: Arc<dyn BootstrapProvider> = match &settings.bootstrap_path {
        Some(path) => Arc::new(StaticBootstrap::from_json_file(path)?),
        None => Arc::new(StaticBootstrap::default()),
    };

    let (card_source, session_store): (Arc<dyn CardSource>, Arc<dyn SessionStore>) =
        if settings.offline {
            (Arc::new(MissingCardSource), Arc::new(MissingSessionStore))
        } else {
            (
                Arc::new(HttpCardSource::new(&settings.server_url)?),
                Arc::new(HttpSessionStore::new(&settings.server_url)?),
            )
        };
    info!(
        server_url = %settings.server_url,
        offline = settings.offline,
        "cli: collaborators configured"
    );

    Ok(SwipeDeck::new_with_dependencies(
        EngineConfig::default(),
        client_id,
        card_source,
        session_store,
        bootstrap,
    ))
}
