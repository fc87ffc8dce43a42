//! Operator intents parsed from the command line.
//!
//! Parsing is pure so every command form is unit-testable; the main loop owns
//! all side effects.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Charts,
    Config,
    Policies,
    Set { path: String, raw: String },
    AddPublisher,
    DelPublisher { index: usize },
    EditPolicy { policy: String, args: Vec<(String, String)> },
    Submit { policy: String },
    Scrub { scatter: bool, index: usize, value: f64 },
    Step { steps: u32 },
    Reset,
    Export { path: Option<PathBuf> },
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or("empty command")?;
        let cmd = match head {
            "help" => Self::Help,
            "status" => Self::Status,
            "charts" => Self::Charts,
            "config" => Self::Config,
            "policies" => Self::Policies,
            "set" => {
                let path = parts.next().ok_or("usage: set <PATH> <VALUE>")?.to_string();
                let raw = parts.next().ok_or("usage: set <PATH> <VALUE>")?.to_string();
                Self::Set { path, raw }
            }
            "add-publisher" => Self::AddPublisher,
            "del-publisher" => {
                let index = parts
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("usage: del-publisher <INDEX>")?;
                Self::DelPublisher { index }
            }
            "policy" => {
                let policy = parts
                    .next()
                    .ok_or("usage: policy <NAME> <ARG>=<VALUE> ...")?
                    .to_string();
                let mut args = Vec::new();
                for pair in parts.by_ref() {
                    let (name, raw) = pair
                        .split_once('=')
                        .ok_or_else(|| format!("expected ARG=VALUE, got {pair:?}"))?;
                    args.push((name.to_string(), raw.to_string()));
                }
                if args.is_empty() {
                    return Err("usage: policy <NAME> <ARG>=<VALUE> ...".to_string());
                }
                Self::EditPolicy { policy, args }
            }
            "submit" => {
                let policy = parts.next().ok_or("usage: submit <NAME>")?.to_string();
                Self::Submit { policy }
            }
            "scrub" => {
                let scatter = match parts.next() {
                    Some("chart") => false,
                    Some("scatter") => true,
                    _ => return Err("usage: scrub chart|scatter <INDEX> <VALUE>".to_string()),
                };
                let index = parts
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("usage: scrub chart|scatter <INDEX> <VALUE>")?;
                let value = parts
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("usage: scrub chart|scatter <INDEX> <VALUE>")?;
                Self::Scrub { scatter, index, value }
            }
            "step" => {
                let steps = parts
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("usage: step <N>")?;
                Self::Step { steps }
            }
            "reset" => Self::Reset,
            "export" => Self::Export {
                path: parts.next().map(PathBuf::from),
            },
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command: {other} (try `help`)")),
        };
        if let Some(extra) = parts.next() {
            return Err(format!("unexpected argument: {extra}"));
        }
        Ok(cmd)
    }
}
