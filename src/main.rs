use clap::Parser;
use lcv::cli::{Cli, Commands};
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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
    let global = cli.global;

    // LCV_LOG overrides; otherwise warnings only, or debug with --verbose
    let filter = EnvFilter::try_from_env("LCV_LOG").unwrap_or_else(|_| {
        if global.verbose {
            EnvFilter::new("lcv=debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Validate(args) => lcv::cli::commands::validate::run(args, &global),
        Commands::Show(args) => lcv::cli::commands::show::run(args, &global),
        Commands::Fmt(args) => lcv::cli::commands::fmt::run(args, &global),
        Commands::Schema(cmd) => lcv::cli::commands::schema::run(cmd, &global),
        Commands::Completions(args) => lcv::cli::commands::completions::run(args),
    }
}
