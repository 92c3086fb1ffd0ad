mod app;
mod config;

use crate::app::App;
use crate::config::PlacerConfig;
use clap::Parser;
use placer_runtime::RuntimeEvent;
use std::path::PathBuf;
use winit::event_loop::{DeviceEvents, EventLoop};

#[derive(Parser)]
#[command(version, about = "Tap-to-place AR demo")]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn run_app(event_loop: EventLoop<RuntimeEvent>, mut app: App) {
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("event loop exited with error: {err}");
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = PlacerConfig::load(args.config.as_deref())?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let event_loop = EventLoop::<RuntimeEvent>::with_user_event().build()?;
    event_loop.listen_device_events(DeviceEvents::Always);

    let app = App::new(&event_loop, config);
    run_app(event_loop, app);
    Ok(())
}
