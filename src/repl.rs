//! Interactive REPL.

use crate::commands::{self, QueryOptions};
use colored::Colorize;
use gremlin_client::Client;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use serde_json::Value;

const HELP_TEXT: &str = r#"
Anything not starting with ':' is sent to the server as a Gremlin script.

Commands:
  :help                         Show this help
  :session <id>                 Evaluate in a server-side session
  :session off                  Go back to sessionless requests
  :bind <name> <json>           Add a script binding
  :unbind <name>                Remove a script binding
  :bindings                     Show current bindings
  :batch <n>                    Ask the server for batches of n results
  :batch off                    Use the server's batch size
  :raw                          Toggle pretty-printing of results
  :quit, :exit                  Exit the REPL
"#;

enum Outcome {
    Print(String),
    Quiet,
    Exit,
}

pub async fn run(client: Client, mut options: QueryOptions) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "gremlin CLI".bold().cyan());
    println!("{} {}", "Connected to".green(), client.endpoint());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".gremlin_history"))
        .unwrap_or_else(|_| ".gremlin_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type ':help' for available commands.\n");

    loop {
        let prompt = match &options.session {
            Some(session) => format!("{} ", format!("gremlin[{}]>", session).cyan()),
            None => format!("{} ", "gremlin>".cyan()),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_line(&client, &mut options, line).await {
                    Ok(Outcome::Print(output)) => println!("{}\n", output),
                    Ok(Outcome::Quiet) => {}
                    Ok(Outcome::Exit) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }

                if !client.is_connected() {
                    println!("{}", "Connection lost.".red());
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_line(
    client: &Client,
    options: &mut QueryOptions,
    line: &str,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    if !line.starts_with(':') {
        return Ok(Outcome::Print(commands::execute(client, line, options).await?));
    }
    apply_command(options, line)
}

/// Handles a `:` command that only changes local state.
fn apply_command(options: &mut QueryOptions, line: &str) -> Result<Outcome, Box<dyn std::error::Error>> {
    let mut parts = line.splitn(3, char::is_whitespace);
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let first = parts.next();
    let rest = parts.next();

    match (cmd.as_str(), first, rest) {
        (":help" | ":?", _, _) => Ok(Outcome::Print(HELP_TEXT.to_string())),

        (":quit" | ":exit" | ":q", _, _) => Ok(Outcome::Exit),

        (":session", Some("off"), _) => {
            options.session = None;
            Ok(Outcome::Print("Session closed".yellow().to_string()))
        }
        (":session", Some(id), _) => {
            options.session = Some(id.to_string());
            Ok(Outcome::Print(format!("{} {}", "Using session".green(), id.cyan())))
        }

        (":bind", Some(name), Some(json)) => {
            let value: Value = serde_json::from_str(json)?;
            options
                .bindings
                .get_or_insert_with(Default::default)
                .insert(name.to_string(), value);
            Ok(Outcome::Quiet)
        }

        (":unbind", Some(name), _) => {
            if let Some(bindings) = options.bindings.as_mut() {
                bindings.remove(name);
                if bindings.is_empty() {
                    options.bindings = None;
                }
            }
            Ok(Outcome::Quiet)
        }

        (":bindings", _, _) => match &options.bindings {
            Some(bindings) => Ok(Outcome::Print(commands::format_json(&serde_json::to_value(
                bindings,
            )?))),
            None => Ok(Outcome::Print("No bindings".yellow().to_string())),
        },

        (":batch", Some("off"), _) => {
            options.batch_size = None;
            Ok(Outcome::Quiet)
        }
        (":batch", Some(n), _) => {
            options.batch_size = Some(n.parse()?);
            Ok(Outcome::Quiet)
        }

        (":raw", _, _) => {
            options.pretty = !options.pretty;
            let mode = if options.pretty { "pretty" } else { "raw" };
            Ok(Outcome::Print(format!("Output: {}", mode.cyan())))
        }

        _ => Ok(Outcome::Print(format!(
            "Unknown or incomplete command: {}. Type ':help' for help.",
            line
        ))),
    }
}
