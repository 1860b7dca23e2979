//! Macro table and expansion.
//!
//! A macro invocation is a line whose head atom names a macro. Arguments bind
//! positionally, or by keyword with `param:value`. Missing arguments fall back
//! to the parameter default. Every atom in the body equal to a parameter name
//! is replaced by the bound argument, at any depth. Expanded bodies are
//! expanded again until no macro heads remain.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, ScenarioError};
use crate::event::Event;

#[derive(Clone, Debug, PartialEq)]
pub struct MacroParam {
    pub name: String,
    pub default: Option<Event>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<MacroParam>,
    pub body: Vec<Event>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Macros {
    entries: BTreeMap<String, Macro>,
}

impl Macros {
    pub fn insert(&mut self, item: Macro) -> Option<Macro> {
        self.entries.insert(item.name.clone(), item)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expands `event` into the sequence of events to dispatch.
///
/// A self-referential macro chain fails with a syntax error naming the cycle.
pub fn expand_event(macros: &Macros, event: &Event) -> Result<Vec<Event>> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    expand_into(macros, event, &mut stack, &mut out)?;
    Ok(out)
}

fn expand_into(
    macros: &Macros,
    event: &Event,
    stack: &mut Vec<String>,
    out: &mut Vec<Event>,
) -> Result<()> {
    let Some(found) = event.head().and_then(|head| macros.get(head)) else {
        out.push(event.clone());
        return Ok(());
    };
    if stack.iter().any(|name| name == &found.name) {
        let mut cycle = stack.clone();
        cycle.push(found.name.clone());
        return Err(ScenarioError::syntax(
            format!("macro cycle {}", cycle.join(" -> ")),
            event.to_string(),
            1,
        ));
    }
    let bindings = bind_params(found, event)?;
    debug!(name = %found.name, "expanding macro");
    stack.push(found.name.clone());
    for line in &found.body {
        let substituted = substitute(line, &bindings);
        expand_into(macros, &substituted, stack, out)?;
    }
    stack.pop();
    Ok(())
}

fn bind_params(found: &Macro, event: &Event) -> Result<BTreeMap<String, Event>> {
    let mut positional = Vec::new();
    let mut keyword = BTreeMap::new();
    for arg in event.tokens().iter().skip(1) {
        let named = arg.as_atom().and_then(|text| text.split_once(':')).filter(
            |(key, _)| found.params.iter().any(|param| param.name == *key),
        );
        match named {
            Some((key, value)) => {
                keyword.insert(key.to_string(), Event::atom(value));
            }
            None => positional.push(arg.clone()),
        }
    }
    if positional.len() > found.params.len() {
        return Err(ScenarioError::syntax(
            format!(
                "macro `{}` takes {} argument(s), got {}",
                found.name,
                found.params.len(),
                positional.len()
            ),
            event.to_string(),
            1,
        ));
    }
    let mut positional = positional.into_iter();
    let mut bindings = BTreeMap::new();
    for param in &found.params {
        let value = keyword
            .remove(&param.name)
            .or_else(|| positional.next())
            .or_else(|| param.default.clone())
            .ok_or_else(|| {
                ScenarioError::syntax(
                    format!("macro `{}` is missing argument `{}`", found.name, param.name),
                    event.to_string(),
                    1,
                )
            })?;
        bindings.insert(param.name.clone(), value);
    }
    Ok(bindings)
}

fn substitute(event: &Event, bindings: &BTreeMap<String, Event>) -> Event {
    match event {
        Event::Atom(text) => bindings.get(text).cloned().unwrap_or_else(|| event.clone()),
        Event::List(items) => {
            Event::List(items.iter().map(|item| substitute(item, bindings)).collect())
        }
    }
}
