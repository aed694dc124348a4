//! Publish flag parsing
//!
//! Flags are split on whitespace. Quotes group words the way a POSIX shell
//! would, so `-p:Title="My App"` stays a single argument.

use crate::core::config::PUBLISH_FLAGS_ENV;
use crate::core::error::BuildError;
use crate::core::traits::FlagsParser;

#[derive(Debug, Default, Clone, Copy)]
pub struct FlagsResolver;

impl FlagsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl FlagsParser for FlagsResolver {
    fn parse_flags(&self, raw: Option<&str>) -> Result<Vec<String>, BuildError> {
        match raw {
            None => Ok(Vec::new()),
            Some(raw) => split_words(raw)
                .map_err(|message| BuildError::parse(format!("${}", PUBLISH_FLAGS_ENV), message)),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Quote {
    None,
    Single,
    Double,
}

fn split_words(input: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::Single, '\'') => quote = Quote::None,
            (Quote::Single, c) => current.push(c),
            (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => match chars.next() {
                Some(next @ ('"' | '\\' | '$' | '`')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => return Err("unterminated double quote".to_string()),
            },
            (Quote::Double, c) => current.push(c),
            (Quote::None, '\\') => match chars.next() {
                Some(next) => {
                    current.push(next);
                    in_word = true;
                }
                None => return Err("trailing backslash".to_string()),
            },
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (Quote::None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    match quote {
        Quote::Single => return Err("unterminated single quote".to_string()),
        Quote::Double => return Err("unterminated double quote".to_string()),
        Quote::None => {}
    }

    if in_word {
        words.push(current);
    }

    Ok(words)
}
