use anyhow::Result;
use cq_cli::{logging, Cli, Commands, Parser};
use cq_core::SnippetService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = cli.store.config()?;
    tracing::debug!(location = ?config.location, "Using snippet store");
    // Nothing is opened until a command touches the store.
    let service = SnippetService::new(&config);

    match cli.command {
        Commands::List(args) => args.run(&service).await,
        Commands::Get(args) => args.run(&service).await,
        Commands::Save(args) => args.run(&service).await,
        Commands::Delete(args) => args.run(&service).await,
        Commands::Search(args) => args.run(&service).await,
        Commands::Db { subcommand } => subcommand.run(&config, &service).await,
    }
}
