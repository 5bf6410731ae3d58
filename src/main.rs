//! hugo-archive CLI
//!
//! Maintenance tools for a Hugo blog: archive linked resources, cite
//! archived PDFs, migrate front matter.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hugo_archive::archive::{run_archive, ArchiveArgs};
use hugo_archive::cite::{run_cite, CiteArgs};
use hugo_archive::front_matter::{run_convert, ConvertArgs};
use hugo_archive::logging::init_logging;

#[derive(Parser)]
#[command(name = "hugo-archive")]
#[command(version)]
#[command(about = "Archive, cite and migrate the posts of a Hugo blog")]
#[command(long_about = "Maintenance tools for a Hugo blog.\n\nCommands:\n  archive               Archive linked resources and rewrite posts\n  cite                  Generate APA citations for archived PDFs\n  convert-front-matter  Convert `key: value` front matter to TOML")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive resources referenced by shortcodes and point posts at the copies
    Archive(ArchiveArgs),
    /// Add APA citations to references of archived PDFs
    Cite(CiteArgs),
    /// Convert `key: value` lines in +++ front matter to `key = value`
    ConvertFrontMatter(ConvertArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Archive(args) => run_archive(args).await,
        Commands::Cite(args) => run_cite(args).await,
        Commands::ConvertFrontMatter(args) => run_convert(args).await,
    }
}
