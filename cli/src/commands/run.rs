//! Run command implementation.

use nexusclip_core::{Config, NexusClipService, SyncEvent, SystemClipboard};

use crate::ui::print_banner;

/// Run the sync daemon until interrupted.
pub async fn run_service(device_name: String, port: u16) -> anyhow::Result<()> {
    print_banner();

    let mut service = NexusClipService::with_config(device_name, Config { port });

    println!("\x1b[1mDevice:\x1b[0m   {}", service.device_name());
    println!("\x1b[1mPlatform:\x1b[0m {}", service.platform());
    println!("\x1b[1mPort:\x1b[0m     {}", service.port());

    let mut events = service.start(Box::new(SystemClipboard::new())).await?;

    println!("\n\x1b[1;32m✓\x1b[0m Listening for devices and clipboard changes...");
    println!("\x1b[2mPress Ctrl+C to stop.\x1b[0m\n");

    // Handle Ctrl+C / SIGTERM gracefully
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.blocking_send(());
    })?;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                handle_event(event);
            }
            _ = rx.recv() => {
                println!("\n\x1b[1;33mShutting down...\x1b[0m");
                break;
            }
        }
    }

    service.stop().await;
    Ok(())
}

/// Handle a service event and print appropriate output.
fn handle_event(event: SyncEvent) {
    match event {
        SyncEvent::DeviceDiscovered {
            platform,
            name,
            addr,
        } => {
            println!(
                "\x1b[1;32m⬤\x1b[0m Found: \x1b[1m{}\x1b[0m ({}) at {}",
                name, platform, addr
            );
        }
        SyncEvent::DeviceLost { name, addr } => {
            println!(
                "\x1b[1;31m⬤\x1b[0m Disconnected: \x1b[1m{}\x1b[0m ({})",
                name, addr
            );
        }
        SyncEvent::ClipboardReceived { from, preview } => {
            println!("\x1b[1;34m📋\x1b[0m Received from {}: \"{}\"", from, preview);
        }
        SyncEvent::ClipboardSent { preview } => {
            println!("\x1b[1;34m📤\x1b[0m Sent: \"{}\"", preview);
        }
        SyncEvent::AckReceived { from, status } => {
            println!("\x1b[2m✓ ack from {}: {}\x1b[0m", from, status);
        }
    }
}
