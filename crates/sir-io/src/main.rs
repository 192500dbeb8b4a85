use clap::Parser;
use sir_io::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,sir_sampler=info,sir_io=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
