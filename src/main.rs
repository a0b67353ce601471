//! HTTP front end for the keyschema engine.
//!
//! Usage: `keyschema [config-file]`. Without an argument `keyschema.toml` is
//! read from the working directory if it exists; `KEYSCHEMA_*` environment
//! variables override the file and `RUST_LOG` overrides the log filter.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use keyschema::config::{DEFAULT_CONFIG_FILE, Settings};
use keyschema::engine::{Engine, Request};
use keyschema::error::Result;
use keyschema::interface::RequestInterface;
use keyschema::server;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_owned());
    let settings = Settings::load(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).compact().init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path,
        persistence = ?settings.persistence,
        depth_policy = ?settings.depth_policy,
        "starting keyschema"
    );

    let engine = Engine::new(settings.open_store()?, &settings);
    let interface = Arc::new(RequestInterface::new(engine));

    if let Some(schema_file) = &settings.startup_schema {
        let document = std::fs::read_to_string(schema_file)?;
        let outcome = interface.execute(&Request::Load { document });
        match outcome.result {
            Ok(_) => info!(file = %schema_file, ms = outcome.elapsed_ms(), "startup schema loaded"),
            Err(e) => {
                warn!(file = %schema_file, error = %e, "startup schema rejected");
                return Err(e);
            }
        }
    }

    let app = server::router(interface);
    let listener = tokio::net::TcpListener::bind(&settings.listen).await?;
    info!(listen = %settings.listen, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
