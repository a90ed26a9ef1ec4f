//! Atrium - desktop entry point

#[cfg(not(target_arch = "wasm32"))]
mod native_main {
    use anyhow::Result;
    use atrium_core::{Variant, ViewerConfig, ViewerMode};
    use atrium_viewer::{app, params::LaunchParams};
    use bevy::app::AppExit;
    use clap::Parser;
    use std::path::PathBuf;
    use tracing::{info, Level};
    use tracing_subscriber::FmtSubscriber;

    #[derive(Parser, Debug)]
    #[command(name = "atrium")]
    #[command(about = "Interactive 3D viewer for the building and its units")]
    #[command(version)]
    struct Args {
        /// Path to configuration file
        #[arg(short, long, default_value = "atrium.toml")]
        config: PathBuf,

        /// Viewer to start (unit, building)
        #[arg(short, long)]
        mode: Option<ViewerMode>,

        /// Unit number to show
        #[arg(short, long)]
        unit: Option<u32>,

        /// Model variant (with, without, furniture)
        #[arg(long)]
        variant: Option<Variant>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    }

    pub fn main() -> Result<()> {
        let args = Args::parse();

        // Initialize logging
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;

        info!("Atrium v{}", env!("CARGO_PKG_VERSION"));

        let config = ViewerConfig::load(&args.config)?;
        let launch = LaunchParams {
            mode: args.mode,
            unit: args.unit,
            variant: args.variant,
        }
        .request(config.assets.default_unit);

        match app::run(config, launch) {
            AppExit::Success => Ok(()),
            AppExit::Error(code) => anyhow::bail!("viewer exited with code {code}"),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native_main::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
