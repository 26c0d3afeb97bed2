use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "SETTLE_HOST",
        "SETTLE_PORT",
        "SETTLE_DATABASE_URL",
        "SETTLE_RELAY_URL",
        "SETTLE_RECONCILE_INTERVAL",
        "SETTLE_CHAIN_QUERY_TIMEOUT",
        "SETTLE_WS_QUEUE_SIZE",
        "SETTLE_EVENT_BUFFER",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    // Only ever report whether the relay secret is present
    let secret = match env::var("SETTLE_RELAY_HMAC_SECRET") {
        Ok(s) if !s.trim().is_empty() => "(set)",
        _ => "Not set. Relay signatures will NOT be checked",
    };
    println!("  {:<35} {secret}", "SETTLE_RELAY_HMAC_SECRET");
}
