use clap::Parser;
use miette::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use whereused::cli::{Cli, Commands, GlobalOpts};

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
    init_tracing(&global)?;

    match cli.command {
        Commands::Init(args) => whereused::cli::commands::init::run(args),
        Commands::Single(args) => whereused::cli::commands::single::run(args, &global),
        Commands::Multi(args) => whereused::cli::commands::multi::run(args, &global),
        Commands::Union(args) => whereused::cli::commands::union::run(args, &global),
        Commands::Platform(args) => whereused::cli::commands::platform::run(args, &global),
        Commands::AssyList(args) => whereused::cli::commands::assy_list::run(args, &global),
        Commands::BomVis(args) => whereused::cli::commands::bom_vis::run(args, &global),
        Commands::Revs(args) => whereused::cli::commands::revs::run(args, &global),
        Commands::Statuses(args) => whereused::cli::commands::statuses::run(args, &global),
        Commands::Config(cmd) => whereused::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => whereused::cli::commands::completions::run(args),
    }
}

/// Log to stderr; `RUST_LOG` overrides the level picked from the flags
fn init_tracing(global: &GlobalOpts) -> Result<()> {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init()
        .map_err(|e| miette::miette!("failed to initialize logging: {}", e))
}
