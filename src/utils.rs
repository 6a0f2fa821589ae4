use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::args::Args;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = tracing_subscriber::fmt::time::LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .init();
}

pub fn format_number(num: u64) -> String {
    num.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_args(args: &Args) -> Result<()> {
    if !args.list_sites && args.counts.is_none() {
        anyhow::bail!("--counts is required unless --list-sites is given");
    }

    if let Some(urls) = &args.urls {
        if urls.is_empty() {
            anyhow::bail!("--urls needs at least one URL");
        }
    }

    Ok(())
}
