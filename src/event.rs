use std::fmt;

/// Parsed form of one scenario expression: an atom or an ordered list of events.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    Atom(String),
    List(Vec<Event>),
}

impl Event {
    pub fn atom(text: impl Into<String>) -> Self {
        Event::Atom(text.into())
    }

    pub fn list(items: Vec<Event>) -> Self {
        Event::List(items)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Event::Atom(text) => Some(text),
            Event::List(_) => None,
        }
    }

    /// Tokens of this event; an atom is its own single token.
    pub fn tokens(&self) -> &[Event] {
        match self {
            Event::Atom(_) => std::slice::from_ref(self),
            Event::List(items) => items,
        }
    }

    /// Leading atom, if the event starts with one.
    pub fn head(&self) -> Option<&str> {
        self.tokens().first().and_then(Event::as_atom)
    }

    /// Everything after the leading token, as a list.
    pub fn tail(&self) -> Event {
        Event::List(self.tokens().iter().skip(1).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Event::List(items) if items.is_empty())
    }

    /// Collapses a one-element list to its element.
    pub fn unwrap_single(self) -> Event {
        match self {
            Event::List(mut items) if items.len() == 1 => items.remove(0),
            other => other,
        }
    }
}

impl From<&str> for Event {
    fn from(text: &str) -> Self {
        Event::atom(text)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Atom(text) if needs_quotes(text) => {
                f.write_str("\"")?;
                for ch in text.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            Event::Atom(text) => f.write_str(text),
            Event::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '"' | ',' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_atoms_with_spaces() {
        let event = Event::list(vec![
            Event::atom("Erc20"),
            Event::atom("Deploy"),
            Event::atom("0x Protocol Token"),
        ]);
        assert_eq!(event.to_string(), "(Erc20 Deploy \"0x Protocol Token\")");
    }

    #[test]
    fn head_and_tail_split_noun() {
        let event = Event::list(vec!["Comptroller".into(), "SetCloseFactor".into(), "0.5".into()]);
        assert_eq!(event.head(), Some("Comptroller"));
        assert_eq!(event.tail().to_string(), "(SetCloseFactor 0.5)");
        assert_eq!(Event::atom("Inspect").tail(), Event::List(vec![]));
    }
}
