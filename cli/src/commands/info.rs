//! Info command implementation.

use nexusclip_core::{Config, NexusClipService};

/// Display device information.
pub fn show_info(device_name: String, port: u16) {
    let service = NexusClipService::with_config(device_name, Config { port });

    println!("\n\x1b[1mNexusClip Device Info\x1b[0m");
    println!("═══════════════════════════════════════");
    println!("\x1b[1mName:\x1b[0m     {}", service.device_name());
    println!("\x1b[1mPlatform:\x1b[0m {}", service.platform());
    println!("\x1b[1mPort:\x1b[0m     {}", service.port());

    println!("\n\x1b[1mLocal IPs:\x1b[0m");
    for ip in nexusclip_core::discovery::get_local_ips() {
        println!("  • {}", ip);
    }
    println!();
}
