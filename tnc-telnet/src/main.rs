use clap::Parser;
use miette::Result;
use tnc_telnet::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    tnc_telnet::run(cli)
}
