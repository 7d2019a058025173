//! Console commands

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Clear,
    History,
    Tools,
    Refresh,
    ToggleDebug,
    ToggleRaw,
    Model,
    Interactions,
    Help,
    /// Blank line
    Empty,
    /// Anything else goes to the model
    Query(String),
}

impl Command {
    /// Parse a line; command words are case-insensitive
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Command::Empty,
            "quit" | "exit" => Command::Quit,
            "clear" => Command::Clear,
            "history" => Command::History,
            "tools" => Command::Tools,
            "refresh" => Command::Refresh,
            "debug" => Command::ToggleDebug,
            "raw" => Command::ToggleRaw,
            "model" => Command::Model,
            "interactions" => Command::Interactions,
            "help" | "?" => Command::Help,
            _ => Command::Query(trimmed.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  quit, exit     leave the chat
  clear          start a new conversation
  history        show the conversation so far
  tools          list the available tools
  refresh        re-discover tools from the MCP server
  debug          toggle timing and tool-call reports
  raw            toggle request/response JSON
  model          show model information
  interactions   show request statistics
  help           show this help
Anything else is sent to the model. Ctrl-C cancels a running query.";
