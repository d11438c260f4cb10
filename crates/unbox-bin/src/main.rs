use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use console::style;
use tracing_subscriber::{filter::LevelFilter, util::SubscriberInitExt, EnvFilter};
use unbox_archive::ExtractionError;

mod commands;
mod preferences;
mod viewer;

/// Inspect and extract zip, tar, tar.gz, tar.bz2, tar.xz and gzip archives.
#[derive(Debug, Parser)]
#[clap(name = "unbox", version, author)]
struct Opt {
    #[command(subcommand)]
    command: commands::Command,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() {
    let opt = Opt::parse();

    if let Err(err) = init_tracing(opt.verbose.tracing_level_filter()) {
        eprintln!("failed to initialize logging: {err}");
    }

    if let Err(err) = commands::run(opt.command).await {
        eprintln!("{} {err:#}", style("error:").red().bold());
        if let Some(err) = err.downcast_ref::<ExtractionError>() {
            for suggestion in err.recovery_suggestions() {
                eprintln!("  {} {suggestion}", style("-").dim());
            }
        }
        std::process::exit(1);
    }
}

/// Installs a `fmt` subscriber. `RUST_LOG` takes precedence over the
/// verbosity flags.
fn init_tracing(level: LevelFilter) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish()
        .try_init()?;

    Ok(())
}
