//! Smart console example: detect the shell, install a marker prompt, and
//! run commands with clean output boundaries.
//!
//! # Usage
//!
//! With password authentication:
//! ```bash
//! cargo run --example smart_console -- --host localhost --user your_username --password your_password
//! ```
//!
//! With SSH key authentication:
//! ```bash
//! cargo run --example smart_console -- --host localhost --user your_username --key ~/.ssh/id_rsa
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use shellsync::SessionBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .command_timeout(Some(Duration::from_secs(args.timeout)));

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let mut session = builder.connect().await?;
    println!("Connected!");

    let timeout = Some(Duration::from_secs(args.timeout));
    let dialect = session.detect_dialect(timeout).await?;
    println!("Shell dialect: {}", dialect);

    let marker = session.configure_smart_console(None, Some(dialect), timeout).await?;
    println!("Prompt marker: {:?}", marker.as_str());

    for command in &args.commands {
        println!("\n$ {}", command);
        println!("{}", "-".repeat(50));

        let response = session.send_command(command).await?;
        if response.is_complete() {
            println!("{}", response.result);
        } else {
            eprintln!("(marker not seen, partial output follows)\n{}", response.result);
        }

        println!("{}", "-".repeat(50));
        println!("Completed in {:?}", response.elapsed);
    }

    println!("\nClosing session...");
    session.close().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        let mut password = None;
        let mut key = None;
        let mut timeout = 30u64;
        let mut commands = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--command" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        commands.push(args[i].clone());
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        if commands.is_empty() {
            commands = vec!["pwd".to_string(), "uname -a".to_string()];
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            timeout,
            commands,
        }
    }

    fn print_help() {
        println!(
            r#"shellsync smart_console example

USAGE:
    cargo run --example smart_console -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        SSH port [default: 22]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password for authentication
    -k, --key <PATH>         Path to SSH private key
    -t, --timeout <SECS>     Connection and command timeout [default: 30]
    -c, --command <CMD>      Command to run (repeatable) [default: pwd, uname -a]
    --help                   Print this help message
"#
        );
    }
}
