use clap::Subcommand;

pub mod extract;
pub mod inspect;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the archive kind of each path
    Detect(inspect::DetectOpt),
    /// List the entries of an archive
    List(inspect::ListOpt),
    /// Estimate the extracted size of an archive
    Size(inspect::SizeOpt),
    /// Extract an archive
    Extract(extract::Opt),
    /// Show the supported archive formats
    Formats,
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Detect(opt) => inspect::detect(opt),
        Command::List(opt) => inspect::list(opt).await,
        Command::Size(opt) => inspect::size(opt).await,
        Command::Extract(opt) => extract::extract(opt).await,
        Command::Formats => inspect::formats(),
    }
}
