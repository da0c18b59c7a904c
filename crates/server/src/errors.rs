use std::fmt;

/// Error when loading the scraper configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(msg) => write!(f, "cannot read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Error for malformed control-surface commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    /// Nothing to parse.
    Empty,
    /// Command tag is not in the vocabulary.
    UnknownCommand(String),
    /// Command requires at least one argument.
    MissingArguments(String),
    /// Argument is not a valid `name,initials,r|g|b` player.
    InvalidPlayer(String),
}

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCommandError::Empty => write!(f, "empty command"),
            ParseCommandError::UnknownCommand(tag) => write!(f, "unknown command `{}`", tag),
            ParseCommandError::MissingArguments(tag) => {
                write!(f, "command `{}` needs at least one argument", tag)
            }
            ParseCommandError::InvalidPlayer(msg) => write!(f, "invalid player: {}", msg),
        }
    }
}

impl std::error::Error for ParseCommandError {}

/// Error scripting the capture boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    Read(String),
    Parse(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Read(msg) => write!(f, "cannot read capture script: {}", msg),
            ScriptError::Parse(msg) => write!(f, "invalid capture script: {}", msg),
        }
    }
}

impl std::error::Error for ScriptError {}
