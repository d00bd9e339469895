//! Scripted shell used by unit tests.
//!
//! Runs on the far end of a `tokio::io::duplex` pair and behaves like an
//! interactive shell on a PTY: it echoes each line, prints a response, then
//! prints its current prompt. `export PS1=` and `set prompt=` change that
//! prompt according to the shell family being imitated.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

/// Lines the fake shell has received, in order.
pub(crate) type CommandLog = Arc<Mutex<Vec<String>>>;

/// Start a fake shell named `shell_name` (as `echo $0` reports it).
pub(crate) fn spawn_shell(shell_name: &'static str) -> (DuplexStream, CommandLog) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let seen = log.clone();

    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        let mut prompt = "$ ".to_string();

        if write.write_all(b"Last login: Mon\r\n$ ").await.is_err() {
            return;
        }

        while let Ok(Some(line)) = lines.next_line().await {
            seen.lock().unwrap().push(line.clone());
            let output = respond(shell_name, &line, &mut prompt);
            let reply = format!("{line}\r\n{output}{prompt}");
            if write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    (client, log)
}

fn is_csh(shell_name: &str) -> bool {
    matches!(shell_name, "csh" | "tcsh")
}

fn quoted_value(rest: &str) -> Option<String> {
    rest.strip_prefix('"')?
        .strip_suffix('"')
        .map(str::to_string)
}

fn respond(shell_name: &str, line: &str, prompt: &mut String) -> String {
    if line.is_empty() || line.starts_with('#') {
        return String::new();
    }
    if line == "echo $0" {
        return format!("-{shell_name}\r\n");
    }
    if let Some(rest) = line.strip_prefix("export PS1=") {
        if is_csh(shell_name) {
            return "export: Command not found.\r\n".to_string();
        }
        if let Some(value) = quoted_value(rest) {
            *prompt = value;
        }
        return String::new();
    }
    if let Some(rest) = line.strip_prefix("set prompt=") {
        if is_csh(shell_name) {
            if let Some(value) = quoted_value(rest) {
                *prompt = value;
            }
        }
        return String::new();
    }
    if let Some(text) = line.strip_prefix("echo ") {
        return format!("{text}\r\n");
    }
    format!("{shell_name}: {line}: command not found\r\n")
}
