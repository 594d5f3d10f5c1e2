//! CLI entry point for the API key manager.
//!
//! Drives the key manager against the `/api/keys` server or a local config
//! file, and exposes the hosted-backend smoke test and realtime watcher.

use anyhow::{Result, bail};
use api_key_manager::{
    backend::{BackendClient, ChangeEvent},
    config::Config,
    fetch::BasicClient,
    infra::{local::LocalKeyStore, rest::RestKeysClient},
    manager::{AppState, AutoConfirm, Confirm, KeyForm, KeyManager, ServiceSelection},
    output::{StdinConfirm, SystemClipboard, TerminalNotifier, print_json},
    services::KeysApi,
    smoke,
    view::KeyDisplay,
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "api_key_manager")]
#[command(about = "Manage per-service API keys", long_about = None)]
struct Cli {
    /// Root URL of the keys server (overrides KEYS_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Use a local JSON config file instead of the keys server
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = "config/api_config.json"
    )]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored keys
    List {
        /// Show keys masked
        #[arg(short, long, default_value_t = false)]
        mask: bool,
    },
    /// Save a key; use "custom" as the service together with --custom
    Save {
        service: String,
        key: String,

        /// Name of a custom service
        #[arg(long)]
        custom: Option<String>,
    },
    /// Replace the key of a service already stored on the keys server
    Update { service: String, key: String },
    /// Delete the key for a service
    Delete {
        service: String,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Test the key for a service
    Test { service: String },
    /// Test every stored key, one after another
    TestAll {
        /// Pause between tests in milliseconds (overrides TEST_ALL_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Show the config template
    Template {
        /// Also copy it to the clipboard
        #[arg(short, long, default_value_t = false)]
        copy: bool,
    },
    /// Show one key as reported by the store
    Get { service: String },
    /// List the services the store supports
    Services,
    /// Check that the keys server is up
    Health,
    /// Check connectivity and registration against the hosted backend
    Smoke {
        #[arg(long, default_value = smoke::DEFAULT_TEST_EMAIL)]
        email: String,

        #[arg(long, default_value = smoke::DEFAULT_TEST_PASSWORD)]
        password: String,
    },
    /// Print realtime changes for a user until Ctrl+C
    Watch {
        user_id: String,

        /// Watch new agent log rows instead of API key changes
        #[arg(long, default_value_t = false)]
        agent_logs: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let config = Config::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = Path::new(&config.log_file_path);
    let log_dir = log_file_path.parent().unwrap_or(Path::new("logs"));
    let log_file_name = log_file_path
        .file_name()
        .unwrap_or(OsStr::new("api_key_manager.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke { email, password } => {
            let (url, key) = config.backend_credentials()?;
            let backend = BackendClient::new(BasicClient::new()?, url, key)?;
            let report = smoke::run(&backend, &email, &password).await;
            print_json(&serde_json::json!({
                "connected": report.connected,
                "registered": report.registered,
            }))?;
            if !report.passed() {
                bail!("backend smoke test failed");
            }
        }
        Commands::Watch {
            user_id,
            agent_logs,
        } => watch(&config, &user_id, agent_logs).await?,
        Commands::Health => {
            let client = server_client(&cli.local, cli.base_url.as_deref(), &config, "health")?;
            print_json(&client.health().await?)?;
        }
        Commands::Update { service, key } => {
            let client = server_client(&cli.local, cli.base_url.as_deref(), &config, "update")?;
            client.update_key(&service, &key).await?;
            info!(service, "Key updated");
        }
        command => match cli.local {
            Some(path) => run_keys(LocalKeyStore::open(path)?, command, &config).await?,
            None => {
                let base_url = cli.base_url.as_deref().unwrap_or(&config.base_url);
                info!(base_url, "Using keys server");
                let client = RestKeysClient::new(BasicClient::new()?, base_url);
                run_keys(client, command, &config).await?
            }
        },
    }

    Ok(())
}

/// Client for commands that only exist on the keys server.
fn server_client(
    local: &Option<PathBuf>,
    base_url: Option<&str>,
    config: &Config,
    command: &str,
) -> Result<RestKeysClient<BasicClient>> {
    if local.is_some() {
        bail!("{command} is only available against the keys server");
    }
    let base_url = base_url.unwrap_or(&config.base_url);
    Ok(RestKeysClient::new(BasicClient::new()?, base_url))
}

/// Runs one key-management command through the controller.
#[tracing::instrument(skip_all)]
async fn run_keys<A: KeysApi>(api: A, command: Commands, config: &Config) -> Result<()> {
    let manager = KeyManager::new(api, TerminalNotifier).with_test_delay(config.test_delay);
    let mut state = AppState::default();

    match command {
        Commands::List { mask } => {
            let display = if mask {
                KeyDisplay::Masked
            } else {
                KeyDisplay::Plain
            };
            let manager = manager.with_display(display);
            if manager.load_keys(&mut state).await.is_completed() {
                print!("{}", state.view);
            }
        }
        Commands::Save {
            service,
            key,
            custom,
        } => {
            let mut form = if service == "custom" {
                KeyForm::custom(custom.as_deref().unwrap_or_default(), &key)
            } else {
                KeyForm::known(&service, &key)
            };
            if custom.is_some() && form.selection != ServiceSelection::Custom {
                warn!("--custom is ignored unless the service is \"custom\"");
            }
            if manager.save_key(&mut state, &mut form).await.is_completed() {
                print!("{}", state.view);
            }
        }
        Commands::Delete { service, yes } => {
            let mut confirm: Box<dyn Confirm> = if yes {
                Box::new(AutoConfirm(true))
            } else {
                Box::new(StdinConfirm)
            };
            if manager
                .delete_key(&mut state, &service, confirm.as_mut())
                .await
                .is_completed()
            {
                print!("{}", state.view);
            }
        }
        Commands::Test { service } => {
            if !manager.test_key(&service).await {
                bail!("key test failed for {service}");
            }
        }
        Commands::TestAll { delay_ms } => {
            let manager = match delay_ms {
                Some(ms) => manager.with_test_delay(Duration::from_millis(ms)),
                None => manager,
            };
            if !manager.load_keys(&mut state).await.is_completed() {
                bail!("could not load keys");
            }
            let results = manager.test_all_keys(&state).await;
            for (service, passed) in &results {
                println!("{service}\t{}", if *passed { "ok" } else { "FAILED" });
            }
        }
        Commands::Template { copy } => {
            let Some(template) = manager.show_config_template().await else {
                bail!("could not fetch the config template");
            };
            println!("{template}");
            if copy {
                manager.copy_config(&template, &mut SystemClipboard);
            }
        }
        Commands::Get { service } => print_json(&manager.api().get_key(&service).await?)?,
        Commands::Services => print_json(&manager.api().list_services().await?)?,
        Commands::Health
        | Commands::Update { .. }
        | Commands::Smoke { .. }
        | Commands::Watch { .. } => {
            bail!("this command does not use the key store")
        }
    }

    Ok(())
}

/// Subscribes to a user's changes and prints each one as JSON until Ctrl+C
/// or the server closes the channel.
#[tracing::instrument(skip(config))]
async fn watch(config: &Config, user_id: &str, agent_logs: bool) -> Result<()> {
    let (url, key) = config.backend_credentials()?;
    let backend = BackendClient::new(BasicClient::new()?, url, key)?;
    let realtime = backend.realtime()?;

    let print_change = |change: ChangeEvent| {
        println!(
            "{}",
            serde_json::json!({
                "type": change.kind,
                "table": change.table,
                "record": change.record,
                "old_record": change.old_record,
            })
        );
    };

    let subscription = if agent_logs {
        realtime.subscribe_to_agent_logs(user_id, print_change).await?
    } else {
        realtime.subscribe_to_user_data(user_id, print_change).await?
    };
    info!(topic = subscription.topic(), "Subscribed. Press Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                subscription.unsubscribe().await?;
                info!("Unsubscribed");
                break;
            }
            _ = poll.tick() => {
                if subscription.is_closed() {
                    warn!("Realtime channel closed by server");
                    break;
                }
            }
        }
    }

    Ok(())
}
