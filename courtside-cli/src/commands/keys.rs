//! Keys command - generate a VAPID key pair.

use colored::Colorize;
use courtside_push::VapidKeys;

use crate::error::CliResult;

/// Generate and print a new key pair.
pub fn run(env: bool) -> CliResult<()> {
    let keys = VapidKeys::generate();

    if env {
        println!("COURTSIDE_VAPID_PUBLIC_KEY={}", keys.public_key_base64url());
        println!("COURTSIDE_VAPID_PRIVATE_KEY={}", keys.private_key_base64url());
        return Ok(());
    }

    println!();
    println!("  {}", "VAPID key pair".bright_cyan().bold());
    println!();
    println!("  {} {}", "Public key: ".bright_white().bold(), keys.public_key_base64url());
    println!("  {} {}", "Private key:".bright_white().bold(), keys.private_key_base64url());
    println!();
    println!(
        "  {} The public key goes to browsers as applicationServerKey.",
        "→".dimmed()
    );
    println!(
        "  {} Keep the private key secret. Rotating it invalidates every subscription.",
        "→".dimmed()
    );
    println!();
    Ok(())
}
