// wimgv - A simple panning image viewer for Wayland
// Shows one image at a time; pan with the mouse or h/j/k/l, cycle with left/right

mod cli;
mod coordinator;
mod error;
mod geometry;
mod image_loader;
mod keybindings;
mod surface;
mod wayland;

use anyhow::Result;
use clap::Parser;
use coordinator::{Coordinator, CoordinatorActor, Event};
use image_loader::ThreadLoader;
use log::{debug, info};
use smithay_client_toolkit::reexports::calloop::channel;
use std::sync::mpsc;
use surface::ChannelSurface;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::Args::parse();

    // Initialize logger
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if args.keybindings {
        print!("{}", keybindings::describe());
        return Ok(());
    }

    let parsed = cli::resolve(args)?;
    info!(
        "Starting wimgv with {} images, window {}x{}",
        parsed.sources.len(),
        parsed.config.initial_viewport.width,
        parsed.config.initial_viewport.height
    );

    // Events into the coordinator, display commands out of it
    let (intake_tx, intake_rx) = mpsc::channel::<Event>();
    let (command_tx, command_rx) = channel::channel();

    let coordinator = Coordinator::new(
        parsed.sources,
        parsed.config,
        ChannelSurface::new(command_tx),
        ThreadLoader::new(intake_tx.clone()),
    )?;
    let actor = CoordinatorActor::spawn(coordinator, intake_rx)?;

    // Loader threads keep their own senders, so stop the coordinator explicitly
    let quit_tx = intake_tx.clone();
    let result = wayland::run(&parsed.config, intake_tx, command_rx);
    if quit_tx.send(Event::Quit).is_err() {
        debug!("Coordinator already stopped");
    }
    actor.join();

    result
}
