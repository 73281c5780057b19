//! Bundlecart shell entry point
//!
//! Reads commands from stdin, one per line, and writes responses to stdout.

use std::{
    io::{self, BufRead, IsTerminal, Write},
    process,
};

use tracing::{error, info};

use bundlecart::{
    config::AppConfig,
    fixtures::{default_catalog, load_catalog},
    observability::init_subscriber,
    receipt::Renderer,
    shell::{Flow, Shell},
    store::Store,
};

fn main() {
    // Load configuration from .env and CLI arguments
    let config = AppConfig::load().unwrap_or_else(|e| e.exit());

    if let Err(e) = init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("{e}");
        }

        process::exit(1);
    }

    let catalog = match &config.catalog {
        Some(path) => load_catalog(path),
        None => default_catalog(),
    };

    let catalog = match catalog {
        Ok(catalog) => catalog,
        Err(load_error) => {
            error!("failed to load catalog: {load_error}");

            process::exit(1);
        }
    };

    info!(
        products = catalog.list_all().count(),
        sellers = catalog.sellers().len(),
        "catalog loaded"
    );

    let store = Store::new(catalog);
    let shell = Shell::new(&store, Renderer::new(config.output, config.currency));

    if let Err(io_error) = run(&shell) {
        error!("shell terminated: {io_error}");

        process::exit(1);
    }
}

fn run(shell: &Shell<'_>) -> io::Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = io::stdout().lock();

    prompt(&mut stdout, interactive)?;

    for line in stdin.lock().lines() {
        let line = line?;

        match shell.execute(&line, &mut stdout) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(shell_error) if shell_error.is_recoverable() => {
                writeln!(stdout, "error: {shell_error}")?;
            }
            Err(shell_error) => return Err(io::Error::other(shell_error)),
        }

        prompt(&mut stdout, interactive)?;
    }

    stdout.flush()
}

fn prompt(out: &mut impl Write, interactive: bool) -> io::Result<()> {
    if interactive {
        write!(out, "> ")?;
        out.flush()?;
    }

    Ok(())
}
