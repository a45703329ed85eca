mod commands;
mod terminal;

use commands::{CommandLine, Commands, scan, verify};
use reachr_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging();

    let command: Commands = commands.command.unwrap_or_default();
    let reverse: bool = matches!(&command, Commands::Scan(args) if args.reverse);
    let cfg: Config = commands.run.to_config(reverse)?;

    print::banner(cfg.quiet);

    match command {
        Commands::Scan(args) => {
            print::header("scanning netblocks", cfg.quiet);
            scan::scan(&commands.run, args, &cfg).await
        }
        Commands::Verify(args) => {
            print::header("verifying ledger", cfg.quiet);
            verify::verify(&commands.run, args, &cfg).await
        }
    }
}
