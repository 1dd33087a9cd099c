use clap::Parser;
use fbt::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    fbt::cli::init_tracing(cli.global.verbose);

    match cli.command {
        Commands::Lookup(args) => fbt::cli::commands::lookup::run(args, &cli.global),
        Commands::Change(args) => fbt::cli::commands::change::run(args, &cli.global),
        Commands::Delete(args) => fbt::cli::commands::delete::run(args, &cli.global),
        Commands::Clean(args) => fbt::cli::commands::clean::run(args, &cli.global),
        Commands::Config(cmd) => fbt::cli::commands::config::run(cmd, &cli.global),
    }
}
