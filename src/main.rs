//! framecast: camera frame distribution
//!
//! Entry point for the framecast binary.

use std::path::PathBuf;
use std::process::ExitCode;

use framecast::capture::SyntheticCapture;
use framecast::config::{load_config_file, parse_args, usage, ConfigError, ConfigStore};
use framecast::{Error, FrameClient, FrameServer, ServerConfig};

mod app;

use app::{exit_code, setup_tracing, shutdown_signal, stdin_control, stdin_reader, Role};

/// Main entry point.
fn main() -> ExitCode {
    let (store, role) = match load_configuration() {
        Ok(loaded) => loaded,
        Err(Error::Config(ConfigError::HelpRequested)) => {
            eprintln!("{}", usage());
            return exit_code::CONFIG_ERROR;
        }
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    setup_tracing(store.flag("verbose"));
    run_application(store, role)
}

/// Command line first, then the config file for anything still unset.
fn load_configuration() -> framecast::Result<(ConfigStore, Role)> {
    let mut store = ConfigStore::new();
    parse_args(&mut store, std::env::args_os())?;

    if let Some(path) = store.get("config").map(PathBuf::from) {
        load_config_file(&mut store, &path)?;
    }
    store.fill_defaults();

    let role = Role::select(&store)?;
    Ok((store, role))
}

fn run_application(store: ConfigStore, role: Role) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            return exit_code::runtime_error();
        }
    };

    let result = runtime.block_on(async move {
        match role {
            Role::Server => run_server(store).await,
            Role::Client => run_client(store).await,
        }
    });

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(Error::Config(e)) => {
            eprintln!("Configuration error: {e}");
            exit_code::CONFIG_ERROR
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::runtime_error()
        }
    }
}

async fn run_server(store: ConfigStore) -> framecast::Result<()> {
    let config = ServerConfig::with_socket(store.text("socket"));

    let mut server = FrameServer::bind(config, store, SyntheticCapture::new()).await?;
    if let Some(stdin) = stdin_reader() {
        server = server.with_control(stdin);
    }

    server.run_until(shutdown_signal()).await?;
    Ok(())
}

async fn run_client(store: ConfigStore) -> framecast::Result<()> {
    let mut client = FrameClient::connect(&store).await?;
    if let Some(control) = stdin_control(store.framing()) {
        client = client.with_control(control);
    }

    client.run_until(shutdown_signal()).await?;
    Ok(())
}
