use log::*;
use service::{config::Config, logging::Logger};
use tokio::signal;

#[tokio::main]
async fn main() {
    let config = get_config();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!("Starting up chat fan-out service...");

    let (app_state, engine) = match service::init_fanout(config) {
        Ok(initialized) => initialized,
        Err(e) => {
            error!("Failed to initialize fan-out core: {e}");
            std::process::exit(1);
        }
    };

    let engine_handle = tokio::spawn(engine.run());

    let shutdown = app_state.shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
        }
        info!("Shutdown signal received, closing live sessions");
        shutdown.cancel();
    });

    let registry = app_state.registry.clone();
    let server_result = web::init_server(app_state).await;

    // The server owned the last log appender, so the engine drains what was
    // already appended and stops.
    if let Err(e) = engine_handle.await {
        error!("Fan-out engine task failed: {e}");
    }

    match server_result {
        Ok(()) => info!(
            "Server stopped with {} sessions still registered",
            registry.len()
        ),
        Err(e) => {
            error!("Server failed: {e}");
            std::process::exit(1);
        }
    }
}

fn get_config() -> Config {
    Config::new()
}
