//! `fbt config` command - show and verify configuration

use console::style;
use miette::{miette, Result};

use crate::cli::args::{ConfigCommands, GlobalOpts};
use crate::cli::helpers::{build_client, load_config};
use crate::core::config::Config;

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(global),
        ConfigCommands::Check => check(global),
    }
}

fn show(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    if let Some(path) = global
        .config
        .clone()
        .or_else(Config::default_path)
    {
        println!("# configuration file: {}", style(path.display()).cyan());
    }
    print!("{}", config.redacted_yaml().map_err(|e| miette!("{}", e))?);
    Ok(())
}

fn check(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    config.require_connection().map_err(|e| miette!("{}", e))?;
    let client = build_client(&config)?;
    client
        .check_credentials()
        .map_err(|e| miette!("credential check failed: {}", e))?;
    println!(
        "{} {} accepts the configured tenant and token.",
        style("ok").green().bold(),
        config.okapi_url
    );
    Ok(())
}
