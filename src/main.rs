mod parser;
mod subcommands;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twofa::config::Config;

use parser::{Action, Cli};
use subcommands::{
    add_subcommand, clear_subcommand, delete_subcommand, edit_subcommand, list_subcommand,
    show_subcommand, uri_subcommand,
};

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twofa=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::new(cli.get_data_dir());
    let mut store = config
        .open_store()
        .with_context(|| format!("could not open the account store in {}", config.data_dir.display()))?;

    match cli.get_action() {
        Action::Add(args) => add_subcommand(args.clone(), &mut store)?,
        Action::Edit(args) => edit_subcommand(args.clone(), &mut store)?,
        Action::Delete(args) => delete_subcommand(args.clone(), &mut store)?,
        Action::Clear => clear_subcommand(&mut store)?,
        Action::List => list_subcommand(&store)?,
        Action::Uri(args) => uri_subcommand(args.clone(), &store)?,
        Action::Show(args) => show_subcommand(args.clone(), store.into_shared())?,
    }

    Ok(())
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{}: {:#}", "error".red(), e);
        std::process::exit(1);
    }
}
