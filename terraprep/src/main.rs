mod map;
mod options;
mod prepare;
mod progress;
mod verify;

use anyhow::Result;
use clap::Parser;
use geometa::Config;
use options::{Cli, Command};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = Config::from(&cli.config);
    config.validate()?;
    match &cli.cmd {
        Command::Elevation(args) => args.run(&cli.out_dir, &config),
        Command::Map(args) => args.run(&cli.out_dir, &config),
        Command::Verify => verify::run(&cli.out_dir),
    }
}
