use crate::errors::ParseCommandError;
use score_core::{Command, Player};

/// A parsed console or control-surface command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Identity mutations for the mutation queue.
    Enqueue(Vec<Command>),
    /// Toggle pause; bypasses the queue.
    Pause,
    /// Drop the current round; bypasses the queue.
    Abandon,
}

pub const ABANDON: &str = "abandon";

/// Parse a console line of the form `command arg...`.
pub fn parse_line(line: &str) -> Result<ControlCommand, ParseCommandError> {
    let mut words = line.split_whitespace();
    let tag = words.next().ok_or(ParseCommandError::Empty)?;
    let args: Vec<&str> = words.collect();
    parse_command(tag, &args)
}

/// Parse a command tag with its arguments. Player arguments use the
/// `name,initials,r|g|b` form; every other command applies to each argument.
pub fn parse_command(tag: &str, args: &[&str]) -> Result<ControlCommand, ParseCommandError> {
    let tag = tag.to_lowercase();

    match tag.as_str() {
        Command::PAUSE => return Ok(ControlCommand::Pause),
        ABANDON => return Ok(ControlCommand::Abandon),
        Command::ADD_PLAYER
        | Command::REMOVE_PLAYER
        | Command::ADD_ACCOUNT
        | Command::REMOVE_ACCOUNT => {}
        _ => return Err(ParseCommandError::UnknownCommand(tag)),
    }

    if args.is_empty() {
        return Err(ParseCommandError::MissingArguments(tag));
    }

    let commands = args
        .iter()
        .map(|arg| match tag.as_str() {
            Command::ADD_PLAYER => arg
                .parse::<Player>()
                .map(Command::AddPlayer)
                .map_err(|e| ParseCommandError::InvalidPlayer(format!("`{}`: {}", arg, e))),
            Command::REMOVE_PLAYER => Ok(Command::RemovePlayer(arg.to_string())),
            Command::ADD_ACCOUNT => Ok(Command::AddAccount(arg.to_string())),
            _ => Ok(Command::RemoveAccount(arg.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ControlCommand::Enqueue(commands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_core::Color;

    #[test]
    fn parses_player_forms() {
        assert_eq!(
            parse_line("add_player Alice,AL,1|2|3"),
            Ok(ControlCommand::Enqueue(vec![Command::AddPlayer(Player::new(
                "Alice",
                "AL",
                Color::new(1, 2, 3)
            ))]))
        );
    }

    #[test]
    fn name_commands_apply_to_each_argument() {
        assert_eq!(
            parse_line("ADD_ACCOUNT one two"),
            Ok(ControlCommand::Enqueue(vec![
                Command::AddAccount("one".into()),
                Command::AddAccount("two".into())
            ]))
        );
    }

    #[test]
    fn out_of_queue_commands() {
        assert_eq!(parse_line("pause"), Ok(ControlCommand::Pause));
        assert_eq!(parse_line("  abandon "), Ok(ControlCommand::Abandon));
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert_eq!(parse_line("   "), Err(ParseCommandError::Empty));
        assert_eq!(
            parse_line("remove_player"),
            Err(ParseCommandError::MissingArguments("remove_player".into()))
        );
        assert_eq!(
            parse_line("dance now"),
            Err(ParseCommandError::UnknownCommand("dance".into()))
        );
        assert!(matches!(
            parse_line("add_player Alice,AL,1|2|3 Bob"),
            Err(ParseCommandError::InvalidPlayer(_))
        ));
    }
}
