use clap::{Parser, ValueEnum};
use miette::Result;

use elca::cli::{Cli, Commands, OutputFormat};
use elca::core::{logging, Config, Project};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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
    let mut global = cli.global;

    let workspace = match &global.root {
        Some(root) => Project::discover_from(root).ok(),
        None => Project::discover().ok(),
    };
    let config = Config::load_for(workspace.as_ref());
    logging::init(global.log_level(config.log_level()), global.log_json);

    if global.format == OutputFormat::Auto {
        if let Some(format) = config
            .default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
        {
            global.format = format;
        }
    }

    match cli.command {
        Commands::Init(args) => elca::cli::commands::init::run(args),
        Commands::Compute(args) => elca::cli::commands::compute::run(args, &global),
        Commands::Cache(cmd) => elca::cli::commands::cache::run(cmd, &global),
        Commands::Report(cmd) => elca::cli::commands::report::run(cmd, &global),
        Commands::Benchmark(args) => elca::cli::commands::benchmark::run(args, &global),
        Commands::Completions(args) => elca::cli::commands::completions::run(args),
    }
}
