//! sitedb Site Server Binary
//!
//! Runs one site: loads the tables listed under `[engine.tables]`, then
//! serves `/query`, `/results` and `/health` until ctrl-c. Fragments bound
//! for other sites are posted to the URLs under `[sites]`.
//!
//! ## Usage
//!
//! ```bash
//! # Settings from sitedb.toml / sitedb.local.toml / SITEDB_*
//! cargo run --bin sitedb-site
//!
//! # Explicit site name and port
//! cargo run --bin sitedb-site -- --site "Site 2" --port 8082
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use sitedb::distributed::HttpTransport;
use sitedb::logging::init_tracing;
use sitedb::protocol::{serve, SiteState};
use sitedb::storage::load_table;
use sitedb::{Config, Engine};

#[derive(Parser)]
#[clap(name = "sitedb-site", version, about = "Serve one sitedb site over HTTP")]
struct Arguments {
    /// Configuration file; defaults to sitedb.toml and sitedb.local.toml.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Site name, overriding `engine.site`.
    #[clap(long)]
    site: Option<String>,
    #[clap(long)]
    host: Option<String>,
    #[clap(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(site) = args.site {
        config.engine.site = site;
    }
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    init_tracing(&config.logging);

    let mut engine = Engine::new(config.engine.site.clone());
    for (name, path) in &config.engine.tables {
        let table = load_table(name, path).with_context(|| format!("loading table {name}"))?;
        info!(site = %config.engine.site, table = %name, tuples = table.len(), "table_hosted");
        engine.put_relation(name.clone(), table);
    }

    // The blocking client owns a runtime of its own; it is built and dropped
    // outside of ours, so `state` outlives the server future.
    let transport = HttpTransport::from_config(&config)?;
    let state = Arc::new(SiteState::new(engine, transport));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(Arc::clone(&state), &config.http))?;
    drop(runtime);
    info!(site = %config.engine.site, results = state.results().len(), "site_exited");
    Ok(())
}
