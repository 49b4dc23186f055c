use formica_core::Vec2;
use formica_simulation::Command;
use thiserror::Error;

/// A line read from stdin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Command(Command),
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected} argument(s)")]
    Arity {
        command: &'static str,
        expected: usize,
    },
    #[error("`{0}` is not a number")]
    NotANumber(String),
}

/// Parses `pause`, `resume`, `freq <hz>`, `food <x> <y> <amount>`,
/// `scout <x> <y>`, `worker <x> <y>` or `quit`.
pub fn parse(line: &str) -> Result<Input, ParseError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(ParseError::Empty)?;
    let args: Vec<&str> = words.collect();

    let input = match name {
        "pause" => {
            arity("pause", &args, 0)?;
            Input::Command(Command::Pause)
        }
        "resume" => {
            arity("resume", &args, 0)?;
            Input::Command(Command::Resume)
        }
        "quit" | "exit" => {
            arity("quit", &args, 0)?;
            Input::Quit
        }
        "freq" => {
            arity("freq", &args, 1)?;
            Input::Command(Command::SetFrequency(number(args[0])?))
        }
        "food" => {
            arity("food", &args, 3)?;
            Input::Command(Command::SpawnFood {
                position: position(&args)?,
                amount: number(args[2])?,
            })
        }
        "scout" => {
            arity("scout", &args, 2)?;
            Input::Command(Command::SpawnScout {
                position: position(&args)?,
            })
        }
        "worker" => {
            arity("worker", &args, 2)?;
            Input::Command(Command::SpawnWorker {
                position: position(&args)?,
            })
        }
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(input)
}

fn arity(command: &'static str, args: &[&str], expected: usize) -> Result<(), ParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ParseError::Arity { command, expected })
    }
}

fn number(word: &str) -> Result<f32, ParseError> {
    word.parse()
        .map_err(|_| ParseError::NotANumber(word.to_string()))
}

fn position(args: &[&str]) -> Result<Vec2, ParseError> {
    Ok(Vec2::new(number(args[0])?, number(args[1])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clock_commands() {
        assert_eq!(parse("pause"), Ok(Input::Command(Command::Pause)));
        assert_eq!(parse("  resume  "), Ok(Input::Command(Command::Resume)));
        assert_eq!(
            parse("freq 60"),
            Ok(Input::Command(Command::SetFrequency(60.0)))
        );
        assert_eq!(parse("quit"), Ok(Input::Quit));
    }

    #[test]
    fn parses_spawn_commands() {
        assert_eq!(
            parse("food 10 20.5 300"),
            Ok(Input::Command(Command::SpawnFood {
                position: Vec2::new(10.0, 20.5),
                amount: 300.0,
            }))
        );
        assert_eq!(
            parse("scout 1 2"),
            Ok(Input::Command(Command::SpawnScout {
                position: Vec2::new(1.0, 2.0),
            }))
        );
        assert_eq!(
            parse("worker 3 4"),
            Ok(Input::Command(Command::SpawnWorker {
                position: Vec2::new(3.0, 4.0),
            }))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("dance"), Err(ParseError::Unknown("dance".into())));
        assert_eq!(
            parse("food 1 2"),
            Err(ParseError::Arity {
                command: "food",
                expected: 3
            })
        );
        assert_eq!(
            parse("freq fast"),
            Err(ParseError::NotANumber("fast".into()))
        );
        assert!(parse("pause now").is_err());
    }
}
