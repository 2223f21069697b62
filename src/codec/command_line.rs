//! Parser for one inbound DBGp command line.
//!
//! Grammar (spec):
//! `<name> SP ("-" <letter> SP <value> SP)* "-" "-" SP <base64-data>`
//!
//! Implemented as the small state machine the protocol is usually described
//! with: `NORMAL, OPT_FOLLOWS, SEP_FOLLOWS, VALUE_FOLLOWS_FIRST_CHAR,
//! VALUE_FOLLOWS, QUOTED, SKIP_CHAR`.

use crate::args::CommandArgs;
use crate::error_code::ErrorCode;

/// A parsed command: its name plus the option table.
#[derive(Debug, Clone)]
pub struct CommandLine {
    pub name: String,
    pub args: CommandArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    OptFollows,
    SepFollows,
    ValueFollowsFirstChar,
    ValueFollows,
    Quoted,
    SkipChar,
}

impl CommandLine {
    /// Parse a single NUL- or newline-delimited command line.
    pub fn parse(line: &str) -> Result<Self, ErrorCode> {
        let line = line.trim_end_matches(['\r', '\n']);
        // a well-formed command always separates its name from its (at
        // least one, "-i") options with a space; a bare word never parses.
        let idx = line.find(' ').ok_or(ErrorCode::ParseError)?;
        let (name, rest) = (&line[..idx], &line[idx + 1..]);
        if name.is_empty() {
            return Err(ErrorCode::ParseError);
        }

        let mut args = CommandArgs::new();
        let mut state = State::Normal;
        let mut letter = 0u8;
        let mut value = String::new();
        let mut quote_char = '"';
        let mut after_skip = State::Quoted;

        let mut chars = rest.chars();
        loop {
            let c = chars.next();
            match state {
                State::Normal => match c {
                    None => break,
                    Some(' ') => {}
                    Some('-') => state = State::OptFollows,
                    Some(_) => return Err(ErrorCode::ParseError),
                },
                State::OptFollows => match c {
                    Some('-') => {
                        return Self::finish_with_data(name, args, chars.as_str());
                    }
                    Some(l @ 'a'..='z') => {
                        letter = l as u8;
                        state = State::SepFollows;
                    }
                    _ => return Err(ErrorCode::ParseError),
                },
                State::SepFollows => match c {
                    Some(' ') => state = State::ValueFollowsFirstChar,
                    _ => return Err(ErrorCode::ParseError),
                },
                State::ValueFollowsFirstChar => {
                    value.clear();
                    match c {
                        Some(q @ ('"' | '\'')) => {
                            quote_char = q;
                            state = State::Quoted;
                        }
                        Some(' ') | None => {
                            if !args.set(letter, String::new()) {
                                return Err(ErrorCode::DuplicateArguments);
                            }
                            state = State::Normal;
                            if c.is_none() {
                                break;
                            }
                        }
                        Some(other) => {
                            value.push(other);
                            state = State::ValueFollows;
                        }
                    }
                }
                State::ValueFollows => match c {
                    Some(' ') | None => {
                        if !args.set(letter, std::mem::take(&mut value)) {
                            return Err(ErrorCode::DuplicateArguments);
                        }
                        state = State::Normal;
                        if c.is_none() {
                            break;
                        }
                    }
                    Some(other) => value.push(other),
                },
                State::Quoted => match c {
                    Some('\\') => {
                        after_skip = State::Quoted;
                        state = State::SkipChar;
                    }
                    Some(ch) if ch == quote_char => {
                        if !args.set(letter, std::mem::take(&mut value)) {
                            return Err(ErrorCode::DuplicateArguments);
                        }
                        state = State::Normal;
                    }
                    Some(ch) => value.push(ch),
                    None => return Err(ErrorCode::ParseError),
                },
                State::SkipChar => match c {
                    Some(ch) => {
                        value.push(ch);
                        state = after_skip;
                    }
                    None => return Err(ErrorCode::ParseError),
                },
            }
        }

        match state {
            State::Normal => Ok(CommandLine {
                name: name.to_string(),
                args,
            }),
            _ => Err(ErrorCode::ParseError),
        }
    }

    fn finish_with_data(name: &str, mut args: CommandArgs, rest: &str) -> Result<Self, ErrorCode> {
        let data = match rest.strip_prefix(' ') {
            Some(data) => data,
            None if rest.is_empty() => "",
            None => return Err(ErrorCode::ParseError),
        };
        if !data.is_empty() && !args.set(b'-', data.to_string()) {
            return Err(ErrorCode::DuplicateArguments);
        }
        Ok(CommandLine {
            name: name.to_string(),
            args,
        })
    }
}
