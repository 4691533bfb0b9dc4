//! Named placeholder scanner using nom.
//!
//! Generated SQL always refers to parameters by name (`:email`). Drivers
//! want positional markers, so before a statement is prepared the text is
//! scanned and every placeholder outside a quoted section is rewritten.
//!
//! ```text
//! SELECT * FROM users WHERE email = :email AND name <> 'a:b' AND id::text = :id
//!                                   ──┬───              ─┬─     ─┬─       ─┬─
//!                                     │                  │       │         └── slot 2
//!                                     │                  │       └── cast, kept
//!                                     │                  └── literal, kept
//!                                     └── slot 1
//! ```

use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char},
    combinator::{map, recognize},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::error::{BakeError, BakeResult};

/// Positional marker syntax expected by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` per occurrence (MySQL, SQLite).
    Question,
    /// `$n` per distinct name (PostgreSQL).
    Dollar,
}

/// SQL rewritten to positional markers, plus the parameter name of every slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSql {
    pub sql: String,
    pub slots: Vec<String>,
}

impl CompiledSql {
    /// Whether the statement references `:name`.
    pub fn defines(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Param(&'a str),
}

/// Scan `input` and rewrite its named placeholders in the given style.
pub fn compile(input: &str, style: PlaceholderStyle) -> BakeResult<CompiledSql> {
    match many0(token)(input) {
        Ok(("", tokens)) => Ok(render(&tokens, style)),
        Ok((remaining, _)) => Err(BakeError::parse(
            input.len() - remaining.len(),
            format!("Unterminated quoted section: '{}'", remaining),
        )),
        Err(e) => Err(BakeError::parse(0, format!("Scan failed: {:?}", e))),
    }
}

fn render(tokens: &[Token<'_>], style: PlaceholderStyle) -> CompiledSql {
    let mut sql = String::new();
    let mut slots: Vec<String> = Vec::new();
    let mut numbered: HashMap<&str, usize> = HashMap::new();

    for token in tokens {
        match (token, style) {
            (Token::Text(text), _) => sql.push_str(text),
            (Token::Param(name), PlaceholderStyle::Question) => {
                sql.push('?');
                slots.push(name.to_string());
            }
            (Token::Param(name), PlaceholderStyle::Dollar) => {
                let n = match numbered.get(name) {
                    Some(n) => *n,
                    None => {
                        slots.push(name.to_string());
                        numbered.insert(*name, slots.len());
                        slots.len()
                    }
                };
                sql.push_str(&format!("${}", n));
            }
        }
    }

    CompiledSql { sql, slots }
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(|i| quoted('\'', i), Token::Text),
        map(|i| quoted('"', i), Token::Text),
        map(|i| quoted('`', i), Token::Text),
        map(tag("::"), Token::Text),
        map(preceded(char(':'), identifier), Token::Param),
        map(
            take_while1(|c: char| !matches!(c, '\'' | '"' | '`' | ':')),
            Token::Text,
        ),
        map(tag(":"), Token::Text),
    ))(input)
}

/// A quoted section, with doubled-quote and backslash escapes.
fn quoted(quote: char, input: &str) -> IResult<&str, &str> {
    let doubled: String = [quote, quote].iter().collect();
    recognize(tuple((
        char(quote),
        many0(alt((
            tag(doubled.as_str()),
            recognize(pair(char('\\'), anychar)),
            take_while1(|c: char| c != quote && c != '\\'),
        ))),
        char(quote),
    )))(input)
}

/// Parse an identifier (parameter name).
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_question_style() {
        let c = compile(
            "INSERT INTO users (name, email) VALUES (:name, :email)",
            PlaceholderStyle::Question,
        )
        .unwrap();
        assert_eq!(c.sql, "INSERT INTO users (name, email) VALUES (?, ?)");
        assert_eq!(c.slots, vec!["name", "email"]);
    }

    #[test]
    fn test_question_style_repeats_slot() {
        let c = compile("SELECT :a, :b, :a", PlaceholderStyle::Question).unwrap();
        assert_eq!(c.sql, "SELECT ?, ?, ?");
        assert_eq!(c.slots, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_dollar_style_numbers_distinct_names() {
        let c = compile("SELECT :a, :b, :a", PlaceholderStyle::Dollar).unwrap();
        assert_eq!(c.sql, "SELECT $1, $2, $1");
        assert_eq!(c.slots, vec!["a", "b"]);
    }

    #[test]
    fn test_literals_and_casts_untouched() {
        let c = compile(
            "SELECT * FROM t WHERE a = 'x:y' AND \"c:d\" = :v AND b::text = 'it''s :no'",
            PlaceholderStyle::Question,
        )
        .unwrap();
        assert_eq!(
            c.sql,
            "SELECT * FROM t WHERE a = 'x:y' AND \"c:d\" = ? AND b::text = 'it''s :no'"
        );
        assert_eq!(c.slots, vec!["v"]);
        assert!(c.defines("v"));
        assert!(!c.defines("no"));
    }

    #[test]
    fn test_lone_colon_is_text() {
        let c = compile("SELECT ':' || :x, 1 :2", PlaceholderStyle::Question).unwrap();
        assert_eq!(c.sql, "SELECT ':' || ?, 1 :2");
    }

    #[test]
    fn test_unterminated_literal() {
        let err = compile("SELECT 'abc", PlaceholderStyle::Question).unwrap_err();
        assert!(matches!(err, BakeError::Parse { position: 7, .. }));
    }
}
