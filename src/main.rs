use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fetchchain::{
    Address, Episode, HttpTransport, Webservice, details_resource, episodes_resource,
    first_episode_details,
};

#[derive(Parser)]
#[command(name = "fetchchain", version, about = "Fetch and chain episode resources")]
struct Cli {
    /// Base address of the episode service
    #[arg(
        short = 'b',
        long = "base",
        global = true,
        env = "FETCHCHAIN_BASE",
        default_value = "http://127.0.0.1:8080",
        value_name = "URL"
    )]
    base: Address,

    /// User agent sent with every request
    #[arg(long, global = true, value_name = "AGENT")]
    user_agent: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log request activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every episode
    List,
    /// Show the details of one episode
    Show {
        /// Episode identifier
        id: String,
    },
    /// Load the list, then the details of its first episode
    First,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let transport = match cli.user_agent.as_deref() {
        Some(agent) => HttpTransport::with_user_agent(agent),
        None => HttpTransport::new(),
    };
    let service = Webservice::new(transport);

    match cli.command {
        Command::List => {
            let episodes = service.load(&episodes_resource(&cli.base)).wait()?;
            if episodes.is_empty() {
                eprintln!("no episodes published at {}", cli.base);
            }
            write_listing(&mut std::io::stdout().lock(), &episodes, cli.json)?;
        }
        Command::Show { id } => {
            let details = service.load(&details_resource(&cli.base, &id)).wait()?;
            if cli.json {
                return print_json(&details);
            }
            println!("{}\n\n{}", details.title, details.description);
        }
        Command::First => {
            let details = first_episode_details(&service, &cli.base).wait()?;
            if cli.json {
                return print_json(&details);
            }
            println!("{}\n\n{}", details.title, details.description);
        }
    }
    Ok(())
}

/// Print one `id<TAB>title` line per episode; an empty list prints nothing.
fn write_listing(out: &mut impl Write, episodes: &[Episode], json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(episodes)?)?;
        return Ok(());
    }
    for episode in episodes {
        writeln!(out, "{}\t{}", episode.id, episode.title)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "fetchchain=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_succeeds_in_both_modes() -> Result<()> {
        let mut text = Vec::new();
        write_listing(&mut text, &[], false)?;
        assert!(text.is_empty());

        let mut json = Vec::new();
        write_listing(&mut json, &[], true)?;
        assert_eq!(String::from_utf8(json)?.trim(), "[]");
        Ok(())
    }

    #[test]
    fn listing_prints_tab_separated_rows() -> Result<()> {
        let episodes = vec![
            Episode {
                id: "42".into(),
                title: "T".into(),
            },
            Episode {
                id: "43".into(),
                title: "U".into(),
            },
        ];
        let mut out = Vec::new();
        write_listing(&mut out, &episodes, false)?;
        assert_eq!(String::from_utf8(out)?, "42\tT\n43\tU\n");
        Ok(())
    }
}
