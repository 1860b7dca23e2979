//! Scenario text to [`Event`] trees and macro tables.
//!
//! A line is a whitespace separated sequence of items. Items are bare atoms,
//! double-quoted strings (whitespace preserved, `\"` `\\` `\n` `\t` escapes),
//! parenthesized sub-lists and bracketed arrays (`[a, b]` reads as `(List a b)`).
//! Lines whose first non-blank character is `#` are comments.

use crate::error::{Result, ScenarioError};
use crate::event::Event;
use crate::macros::{Macro, MacroParam, Macros};

/// Entry rule for [`parse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseRule {
    Event,
    Macros,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    Event(Event),
    Macros(Macros),
}

pub fn parse(text: &str, rule: ParseRule) -> Result<Parsed> {
    match rule {
        ParseRule::Event => parse_event(text).map(Parsed::Event),
        ParseRule::Macros => parse_macros(text).map(Parsed::Macros),
    }
}

/// Parses a single scenario line. Blank and comment lines yield an empty list.
pub fn parse_event(text: &str) -> Result<Event> {
    if is_comment_or_blank(text) {
        return Ok(Event::List(Vec::new()));
    }
    let mut items = parse_items(text)?;
    if items.len() == 1 && matches!(items[0], Event::List(_)) {
        return Ok(items.remove(0));
    }
    Ok(Event::List(items))
}

pub fn is_comment_or_blank(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parses a macro file:
///
/// ```text
/// Macro NewToken symbol name decimals=18
///     Erc20 Deploy Standard symbol name decimals
/// ```
///
/// Header parameters may carry a default after `=`. Body lines are indented.
pub fn parse_macros(text: &str) -> Result<Macros> {
    let mut macros = Macros::default();
    let mut current: Option<Macro> = None;
    for line in text.lines() {
        if is_comment_or_blank(line) {
            continue;
        }
        let indented = line.starts_with(char::is_whitespace);
        if indented {
            let Some(open) = current.as_mut() else {
                return Err(ScenarioError::syntax(
                    "macro body line outside of a macro",
                    line.trim(),
                    1,
                ));
            };
            open.body.push(parse_event(line.trim())?);
            continue;
        }
        if let Some(done) = current.take() {
            macros.insert(done);
        }
        current = Some(parse_macro_header(line)?);
    }
    if let Some(done) = current.take() {
        macros.insert(done);
    }
    Ok(macros)
}

fn parse_macro_header(line: &str) -> Result<Macro> {
    let items = parse_items(line)?;
    let mut iter = items.into_iter();
    match iter.next() {
        Some(Event::Atom(keyword)) if keyword == "Macro" => {}
        _ => {
            return Err(ScenarioError::syntax(
                "expected `Macro <Name> <params...>`",
                line,
                1,
            ));
        }
    }
    let name = match iter.next() {
        Some(Event::Atom(name)) => name,
        _ => return Err(ScenarioError::syntax("macro is missing a name", line, 1)),
    };
    let mut params = Vec::new();
    while let Some(item) = iter.next() {
        let Event::Atom(raw) = item else {
            return Err(ScenarioError::syntax(
                format!("macro `{name}` parameter must be an identifier"),
                line,
                1,
            ));
        };
        match raw.split_once('=') {
            None => params.push(MacroParam {
                name: raw.clone(),
                default: None,
            }),
            Some((param, "")) => {
                let default = iter.next().ok_or_else(|| {
                    ScenarioError::syntax(format!("parameter `{param}` has no default"), line, 1)
                })?;
                params.push(MacroParam {
                    name: param.to_string(),
                    default: Some(default),
                });
            }
            Some((param, default)) => params.push(MacroParam {
                name: param.to_string(),
                default: Some(Event::atom(default)),
            }),
        }
    }
    Ok(Macro {
        name,
        params,
        body: Vec::new(),
    })
}

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    OpenBracket,
    CloseBracket,
    Atom(String),
}

struct Lexed {
    token: Token,
    column: usize,
}

fn lex(text: &str) -> Result<Vec<Lexed>> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        match c {
            c if c.is_whitespace() || c == ',' => i += 1,
            '(' => {
                out.push(Lexed { token: Token::Open, column });
                i += 1;
            }
            ')' => {
                out.push(Lexed { token: Token::Close, column });
                i += 1;
            }
            '[' => {
                out.push(Lexed { token: Token::OpenBracket, column });
                i += 1;
            }
            ']' => {
                out.push(Lexed { token: Token::CloseBracket, column });
                i += 1;
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    let Some(&ch) = chars.get(i) else {
                        return Err(ScenarioError::syntax("unterminated string", text, column));
                    };
                    i += 1;
                    match ch {
                        '"' => break,
                        '\\' => {
                            let escaped = chars.get(i).copied().ok_or_else(|| {
                                ScenarioError::syntax("unterminated escape", text, i)
                            })?;
                            i += 1;
                            value.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                        }
                        other => value.push(other),
                    }
                }
                out.push(Lexed { token: Token::Atom(value), column });
            }
            _ => {
                let start = i;
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && !matches!(chars[i], '(' | ')' | '[' | ']' | '"' | ',')
                {
                    i += 1;
                }
                let atom: String = chars[start..i].iter().collect();
                out.push(Lexed { token: Token::Atom(atom), column });
            }
        }
    }
    Ok(out)
}

fn parse_items(text: &str) -> Result<Vec<Event>> {
    let tokens = lex(text)?;
    let mut pos = 0;
    let items = parse_sequence(text, &tokens, &mut pos, None)?;
    Ok(items)
}

fn parse_sequence(
    text: &str,
    tokens: &[Lexed],
    pos: &mut usize,
    closer: Option<(Token, usize)>,
) -> Result<Vec<Event>> {
    let mut items = Vec::new();
    while let Some(lexed) = tokens.get(*pos) {
        *pos += 1;
        match &lexed.token {
            Token::Atom(value) => items.push(Event::Atom(value.clone())),
            Token::Open => {
                let inner = parse_sequence(text, tokens, pos, Some((Token::Close, lexed.column)))?;
                items.push(Event::List(inner));
            }
            Token::OpenBracket => {
                let mut inner = vec![Event::atom("List")];
                inner.extend(parse_sequence(
                    text,
                    tokens,
                    pos,
                    Some((Token::CloseBracket, lexed.column)),
                )?);
                items.push(Event::List(inner));
            }
            close @ (Token::Close | Token::CloseBracket) => {
                return match &closer {
                    Some((expected, _)) if expected == close => Ok(items),
                    _ => Err(ScenarioError::syntax(
                        format!("unexpected `{}`", closing_char(close)),
                        text,
                        lexed.column,
                    )),
                };
            }
        }
    }
    match closer {
        None => Ok(items),
        Some((expected, column)) => Err(ScenarioError::syntax(
            format!("missing closing `{}`", closing_char(&expected)),
            text,
            column,
        )),
    }
}

fn closing_char(token: &Token) -> char {
    match token {
        Token::CloseBracket => ']',
        _ => ')',
    }
}
