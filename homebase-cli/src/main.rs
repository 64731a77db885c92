use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use homebase_state::backends::cloudflare::ENV_ACCOUNT_ID;
use homebase_state::{BlobKind, Home, Provider, ProviderConfig, Value, create_provider};

#[derive(Parser)]
#[command(name = "homebase")]
#[command(about = "Remote state home for deployments", long_about = None)]
struct Cli {
    /// Provider holding the state bucket
    #[arg(long, default_value = "cloudflare", global = true)]
    provider: String,

    /// JSON file with provider attributes (apiToken, apiKey, email, accountId)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log account selection and bootstrap activity
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved credentials as KEY=value lines
    Env,
    /// Ensure the state bucket exists
    Bootstrap,
    /// Write a stored blob to stdout
    Get {
        /// Blob kind (app, passphrase, secret, ...)
        #[arg(long, default_value = "app")]
        kind: String,
        app: String,
        stage: String,
    },
    /// Store a blob read from a file or stdin
    Put {
        /// Blob kind (app, passphrase, secret, ...)
        #[arg(long, default_value = "app")]
        kind: String,
        app: String,
        stage: String,

        /// Read the blob from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a stored blob
    Rm {
        /// Blob kind (app, passphrase, secret, ...)
        #[arg(long, default_value = "app")]
        kind: String,
        app: String,
        stage: String,
    },
    /// Manage the passphrase of an app/stage
    Passphrase {
        #[command(subcommand)]
        command: PassphraseCommands,
    },
}

#[derive(Subcommand)]
enum PassphraseCommands {
    /// Print the stored passphrase
    Get { app: String, stage: String },
    /// Store a passphrase
    Set {
        app: String,
        stage: String,
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(&cli.provider, cli.config.as_deref())?;
    let mut provider = create_provider(&config).await.map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Env => {
            run_env(provider.as_ref());
            Ok(())
        }
        Commands::Bootstrap => run_bootstrap(provider.as_mut()).await,
        Commands::Get { kind, app, stage } => {
            let home = ready_home(provider.as_mut()).await?;
            run_get(home, &kind, &app, &stage).await
        }
        Commands::Put {
            kind,
            app,
            stage,
            file,
        } => {
            let data = read_input(file.as_deref())?;
            let home = ready_home(provider.as_mut()).await?;
            run_put(home, &kind, &app, &stage, &data).await
        }
        Commands::Rm { kind, app, stage } => {
            let home = ready_home(provider.as_mut()).await?;
            run_rm(home, &kind, &app, &stage).await
        }
        Commands::Passphrase { command } => {
            let home = ready_home(provider.as_mut()).await?;
            run_passphrase_command(home, command).await
        }
    }
}

/// Build the provider configuration from an optional JSON attribute file
fn load_config(provider_type: &str, path: Option<&Path>) -> Result<ProviderConfig, String> {
    let mut config = ProviderConfig::new(provider_type);

    let Some(path) = path else {
        return Ok(config);
    };

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    match Value::from(json) {
        Value::Map(attributes) => {
            config.attributes = attributes;
            Ok(config)
        }
        other => Err(format!(
            "{}: expected a JSON object of provider attributes, got {}",
            path.display(),
            other.type_name()
        )),
    }
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>, String> {
    match file {
        Some(path) => {
            fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
        }
        None => {
            let mut data = Vec::new();
            io::stdin()
                .read_to_end(&mut data)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(data)
        }
    }
}

async fn ready_home(provider: &mut dyn Provider) -> Result<&dyn Home, String> {
    provider.as_home().await.map_err(|e| e.to_string())
}

fn format_env(env: HashMap<String, String>) -> Vec<String> {
    let mut vars: Vec<(String, String)> = env.into_iter().collect();
    vars.sort();
    vars.into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect()
}

fn run_env(provider: &dyn Provider) {
    for line in format_env(provider.env()) {
        println!("{}", line);
    }
}

async fn run_bootstrap(provider: &mut dyn Provider) -> Result<(), String> {
    let account = provider
        .env()
        .get(ENV_ACCOUNT_ID)
        .cloned()
        .unwrap_or_default();
    let key = provider.key();

    ready_home(provider).await?;

    println!(
        "{} {} state home ready in account {}",
        "✓".green(),
        key,
        account.bold()
    );
    Ok(())
}

async fn run_get(home: &dyn Home, kind: &str, app: &str, stage: &str) -> Result<(), String> {
    let data = home
        .get_data(BlobKind::from_name(kind), app, stage)
        .await
        .map_err(|e| e.to_string())?;

    match data {
        Some(bytes) => io::stdout()
            .write_all(&bytes)
            .map_err(|e| format!("Failed to write stdout: {}", e)),
        None => {
            eprintln!(
                "{}",
                format!("No {} blob stored for {}/{}", kind, app, stage).yellow()
            );
            Ok(())
        }
    }
}

async fn run_put(
    home: &dyn Home,
    kind: &str,
    app: &str,
    stage: &str,
    data: &[u8],
) -> Result<(), String> {
    home.put_data(BlobKind::from_name(kind), app, stage, data)
        .await
        .map_err(|e| e.to_string())?;

    eprintln!(
        "{} Stored {} bytes at {}/{}/{}",
        "✓".green(),
        data.len(),
        kind,
        app,
        stage
    );
    Ok(())
}

async fn run_rm(home: &dyn Home, kind: &str, app: &str, stage: &str) -> Result<(), String> {
    home.remove_data(BlobKind::from_name(kind), app, stage)
        .await
        .map_err(|e| e.to_string())?;

    eprintln!("{} Removed {}/{}/{}", "✓".green(), kind, app, stage);
    Ok(())
}

async fn run_passphrase_command(
    home: &dyn Home,
    command: PassphraseCommands,
) -> Result<(), String> {
    match command {
        PassphraseCommands::Get { app, stage } => {
            match home
                .get_passphrase(&app, &stage)
                .await
                .map_err(|e| e.to_string())?
            {
                Some(passphrase) => println!("{}", passphrase),
                None => eprintln!(
                    "{}",
                    format!("No passphrase set for {}/{}", app, stage).yellow()
                ),
            }
            Ok(())
        }
        PassphraseCommands::Set { app, stage, value } => {
            home.set_passphrase(&app, &stage, &value)
                .await
                .map_err(|e| e.to_string())?;
            eprintln!("{} Passphrase stored for {}/{}", "✓".green(), app, stage);
            Ok(())
        }
    }
}
