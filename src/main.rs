use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use streamhost::config::{AppState, Config};
use streamhost::download::LocalPipeline;
use streamhost::{handler, logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config file path without extension; `config` picks up config.toml
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Connections run as local tasks; producers are plain spawned tasks
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let pipeline = Arc::new(LocalPipeline::new(cfg.paths.download_directory.clone()));
    let state = Arc::new(AppState::new(cfg, pipeline));
    let connections = Arc::new(AtomicUsize::new(0));

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::run_server_loop(
            listener,
            Arc::clone(&state),
            connections,
            Arc::clone(&signals.shutdown),
        ))
        .await;

    let pending = state.uploads.drain();
    logger::log_shutdown(pending.len());
    handler::remove_uploads(&pending);
    Ok(())
}
