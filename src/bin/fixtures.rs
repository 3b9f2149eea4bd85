use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fetchchain::FixtureServer;

#[derive(Parser, Debug)]
#[command(name = "fixtures", about = "Serve a directory of JSON fixtures over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Directory holding episodes.json and episodes/<id>.json
    #[arg(long, default_value = "fixtures")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let server = FixtureServer::bind(&args.listen, &args.dir)?;
    println!(
        "serving {} on {}",
        args.dir.display(),
        server.base_address()?
    );
    server.serve();
    Ok(())
}
