//! Point d'entrée CLI pour otelo-pg

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Calculer le besoin en logement OTELO à l'EPCI et à la zone
#[derive(Parser)]
#[command(name = "otelo-pg")]
#[command(author, version)]
#[command(about = "Calculer le besoin en logement OTELO sur les packs régionaux PostgreSQL")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Epci {
            code,
            calcul,
            zone,
            evol_demo,
            tx_restructuration,
            tx_disparition,
            tx_lv,
            tx_rs,
        } => {
            info!(code = %code, region = %calcul.pack.region, "Calcul EPCI");
            cli::cmd_epci(
                &code,
                &calcul,
                zone.as_deref(),
                evol_demo,
                tx_restructuration,
                tx_disparition,
                tx_lv,
                tx_rs,
            )
            .await?;
        }
        Commands::Zo { code, calcul } => {
            info!(code = %code, region = %calcul.pack.region, "Calcul zone");
            cli::cmd_zo(&code, &calcul).await?;
        }
        Commands::Region {
            calcul,
            jobs,
            custom,
            no_zones,
        } => {
            info!(region = %calcul.pack.region, "Calcul région");
            cli::cmd_region(&calcul, jobs, custom.as_deref(), no_zones).await?;
        }
        Commands::Territoires { pack } => {
            cli::cmd_territoires(&pack).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
