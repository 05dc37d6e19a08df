use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    // Initialize core
    calendula_core::init()?;

    tracing::info!("Calendula started");

    cli::Cli::run()
}
