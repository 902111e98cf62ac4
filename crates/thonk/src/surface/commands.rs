//! Chat command parsing.
//!
//! Two commands are understood, both behind a configurable prefix:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `{prefix}ai <prompt>` | Run the pipeline on the rest of the message |
//! | `{prefix}config [model] [temperature]` | Store per-user overrides |

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ai {
        /// Everything after the command word, trimmed. May be empty.
        prompt: String,
    },
    Config {
        model: Option<String>,
        temperature: Option<f32>,
    },
}

/// Parse a chat message.
///
/// Returns `Ok(None)` for messages that are not commands, and `Err` with a
/// usage hint for a recognized command with bad arguments.
pub fn parse_command(content: &str, prefix: &str) -> Result<Option<Command>, String> {
    let Some(rest) = content.trim_start().strip_prefix(prefix) else {
        return Ok(None);
    };

    if let Some(prompt) = command_argument(rest, "ai") {
        return Ok(Some(Command::Ai {
            prompt: prompt.trim().to_string(),
        }));
    }

    if let Some(args) = command_argument(rest, "config") {
        let mut words = args.split_whitespace();
        let model = words.next().map(str::to_string);
        let temperature = match words.next() {
            Some(raw) => Some(raw.parse::<f32>().map_err(|_| {
                format!("Usage: {prefix}config [model] [temperature] (got temperature {raw:?})")
            })?),
            None => None,
        };
        return Ok(Some(Command::Config { model, temperature }));
    }

    Ok(None)
}

/// The text after `word` when `rest` starts with it as a whole word.
fn command_argument<'a>(rest: &'a str, word: &str) -> Option<&'a str> {
    let after = rest.strip_prefix(word)?;
    match after.chars().next() {
        None => Some(after),
        Some(c) if c.is_whitespace() => Some(after),
        Some(_) => None,
    }
}
