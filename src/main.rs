use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use nntp_auth_proxy::args::{Args, Command};
use nntp_auth_proxy::constants::hashing::MIN_COST;
use nntp_auth_proxy::logging::init_logging;
use nntp_auth_proxy::runtime::{RuntimeConfig, shutdown_signal};
use nntp_auth_proxy::{
    Config, NntpProxy, create_default_config, hash_password, load_config, proxy, status,
    write_config,
};

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::HashPassword { cost }) = args.command {
        return print_password_hash(cost);
    }

    let _log_guard = init_logging(args.log_file.as_deref());

    let rt = RuntimeConfig::from_args(args.threads).build_runtime()?;
    rt.block_on(run_proxy(args))
}

/// Read one password line from stdin and print its bcrypt hash
fn print_password_hash(cost: u32) -> Result<()> {
    if cost < MIN_COST {
        anyhow::bail!("bcrypt cost must be at least {}", MIN_COST);
    }
    let mut password = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut password)
        .context("Failed to read password from stdin")?;
    let password = password.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("Refusing to hash an empty password");
    }
    println!("{}", hash_password(password, cost)?);
    Ok(())
}

/// Load the config, writing an example one first if the file is missing
fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path).inspect_err(|e| {
            error!("Failed to load config file '{}': {:#}", path.display(), e);
        });
    }

    warn!(
        "Config file '{}' not found, creating default config",
        path.display()
    );
    let config = create_default_config();
    write_config(path, &config)?;
    info!("Created default config file: {}", path.display());
    Ok(config)
}

async fn run_proxy(args: Args) -> Result<()> {
    let mut config = load_or_create_config(&args.config)?;
    args.apply_overrides(&mut config.frontend);

    info!("Loaded {} backend servers:", config.backends.len());
    for backend in &config.backends {
        info!(
            "  - {} ({}:{}{}, max {})",
            backend.name,
            backend.host,
            backend.port,
            if backend.use_tls { ", TLS" } else { "" },
            backend.max_connections
        );
    }
    info!("Loaded {} users", config.users.len());

    let proxy = Arc::new(NntpProxy::new(&config)?);
    let listener =
        proxy::listener::bind(&config.frontend.listen_addr(), proxy.tls_enabled()).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    if config.status.enabled {
        let status_config = config.status.clone();
        let registry = Arc::clone(proxy.registry());
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        tokio::spawn(async move {
            status::serve(&status_config, registry, shutdown).await;
        });
    }

    proxy::listener::serve(proxy, listener, wait_for_shutdown(shutdown_rx)).await?;
    info!("Proxy shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means shutdown
    let _ = rx.wait_for(|stop| *stop).await;
}
