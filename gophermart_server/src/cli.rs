use std::{env, env::VarError};

use clap::Parser;

/// Gophermart order settlement server.
///
/// Every option can also be set through the environment. Values given on the command line win.
#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Arguments {
    /// The address to listen on, as host:port [env: RUN_ADDRESS]
    #[arg(short = 'a', long = "address")]
    pub run_address: Option<String>,
    /// The settlement store connection string [env: DATABASE_URI]
    #[arg(short = 'd', long = "database")]
    pub database_uri: Option<String>,
    /// The base URL of the accrual system [env: ACCRUAL_SYSTEM_ADDRESS]
    #[arg(short = 'r', long = "accrual")]
    pub accrual_address: Option<String>,
    /// The number of poll workers [env: GM_POLL_WORKERS]
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,
    /// Print the current (non-secret) environment settings and exit
    #[arg(long = "show-env")]
    pub show_env: bool,
}

/// Parses the command line. Returns `None` if the process should exit without starting the server.
pub fn handle_command_line_args() -> Option<Arguments> {
    let args = Arguments::parse();
    if args.show_env {
        display_envs();
        return None;
    }
    Some(args)
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "RUN_ADDRESS",
        "ACCRUAL_SYSTEM_ADDRESS",
        "GM_POLL_WORKERS",
        "GM_POLL_QUEUE_CAPACITY",
        "GM_POLL_RETRY_INTERVAL_MS",
        "GM_RATE_LIMIT_FALLBACK_SECS",
        "GM_ACCRUAL_TIMEOUT_SECS",
        "GM_DB_MAX_CONNECTIONS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
