use clap::Parser;

use sceau::cli::Cli;

fn main() -> anyhow::Result<()> {
    sceau::run(Cli::parse())
}
