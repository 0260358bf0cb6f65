use clap::Parser;
use warded::cli::commands;
use warded::cli::{Cli, Commands, Context};
use warded::errors::Result;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        warded::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Completions need neither settings nor a ward.
    if let Commands::Completions { ref shell } = cli.command {
        return commands::completions::execute(shell);
    }

    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Commands::Show { first, ref name } => commands::show::execute(&ctx, name, first),
        Commands::Edit { ref name } => commands::edit::execute(&ctx, name),
        Commands::Generate {
            length,
            ref name,
            charset,
        } => commands::generate::execute(&ctx, length, name.as_deref(), charset),
        Commands::Grep {
            ignore_case,
            ref pattern,
            ref path,
        } => commands::grep::execute(&ctx, pattern, ignore_case, path.as_deref()),
        Commands::List { ref subpath } => commands::list::execute(&ctx, subpath.as_deref()),
        Commands::Copy { ref src, ref dst } => commands::copy::execute(&ctx, src, dst),
        Commands::Move { ref src, ref dst } => commands::move_cmd::execute(&ctx, src, dst),
        Commands::Remove { force, ref name } => commands::remove::execute(&ctx, name, force),
        Commands::Rekey => commands::rekey::execute(&ctx),
        Commands::Stats { json, ref subpath } => {
            commands::stats::execute(&ctx, subpath.as_deref(), json)
        }
        Commands::Data {
            max,
            ref name,
            ref pattern,
        } => commands::data::execute(&ctx, name, pattern, max),
        Commands::Check => commands::check::execute(&ctx),
        #[cfg(feature = "audit-log")]
        Commands::Audit {
            last,
            ref since,
            ref name,
            all_wards,
        } => commands::audit_cmd::execute(
            &ctx,
            &commands::audit_cmd::AuditArgs {
                last,
                since: since.as_deref(),
                name: name.as_deref(),
                all_wards,
            },
        ),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    }
}
