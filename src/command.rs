//! Overload-set dispatch for fetchers and commands.
//!
//! A noun owns an ordered list of candidates. Each candidate declares a name
//! and an [`Arg`] list; dispatch walks the list in declaration order, binds
//! the first candidate whose arguments all resolve, and runs its handler.
//! Failures while binding are collected and reported together when nothing
//! binds. A handler's own failure is returned as is.
//!
//! Binding a candidate:
//!
//! 1. Unless the candidate is a catch-all, the token at `name_pos` must equal
//!    its name (ASCII case-insensitive). That token is removed.
//! 2. Implicit args read the world and consume nothing.
//! 3. Variadic args take every remaining token. Mapped variadics resolve each
//!    token; unmapped ones resolve a lone token directly and several as a list.
//! 4. Positional args take one token each, or their default once tokens run out.
//! 5. Leftover tokens fail the candidate, then the `when` guard is consulted.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::chain::Contract;
use crate::error::{Attempt, Result, ScenarioError};
use crate::event::Event;
use crate::number::Number;
use crate::value::{Address, Value};
use crate::world::World;

/// A resolved argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Value(Value),
    Contract(Contract),
    Many(Vec<Bound>),
}

impl From<Value> for Bound {
    fn from(value: Value) -> Self {
        Bound::Value(value)
    }
}

impl From<Contract> for Bound {
    fn from(contract: Contract) -> Self {
        Bound::Contract(contract)
    }
}

impl From<Address> for Bound {
    fn from(address: Address) -> Self {
        Bound::Value(Value::Address(address))
    }
}

impl From<Number> for Bound {
    fn from(number: Number) -> Self {
        Bound::Value(Value::Number(number))
    }
}

impl From<String> for Bound {
    fn from(text: String) -> Self {
        Bound::Value(Value::String(text))
    }
}

impl From<&str> for Bound {
    fn from(text: &str) -> Self {
        Bound::Value(Value::String(text.to_string()))
    }
}

impl From<bool> for Bound {
    fn from(flag: bool) -> Self {
        Bound::Value(Value::Bool(flag))
    }
}

impl From<Event> for Bound {
    fn from(event: Event) -> Self {
        Bound::Value(Value::Event(event))
    }
}

impl<T: Into<Bound>> From<Vec<T>> for Bound {
    fn from(items: Vec<T>) -> Self {
        Bound::Many(items.into_iter().map(Into::into).collect())
    }
}

/// Typed extraction from a [`Bound`].
pub trait FromBound: Sized {
    const KIND: &'static str;

    fn from_bound(bound: &Bound) -> Option<Self>;
}

impl FromBound for Bound {
    const KIND: &'static str = "any";

    fn from_bound(bound: &Bound) -> Option<Self> {
        Some(bound.clone())
    }
}

impl FromBound for Value {
    const KIND: &'static str = "Value";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Value(value) => Some(value.clone()),
            Bound::Contract(contract) => Some(Value::Address(contract.address)),
            Bound::Many(items) => items.iter().map(Value::from_bound).collect::<Option<_>>().map(Value::List),
        }
    }
}

impl FromBound for Contract {
    const KIND: &'static str = "Contract";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Contract(contract) => Some(contract.clone()),
            _ => None,
        }
    }
}

impl FromBound for Address {
    const KIND: &'static str = "Address";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Value(Value::Address(address)) => Some(*address),
            Bound::Contract(contract) => Some(contract.address),
            _ => None,
        }
    }
}

impl FromBound for Number {
    const KIND: &'static str = "Number";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Value(Value::Number(number)) => Some(number.clone()),
            _ => None,
        }
    }
}

impl FromBound for String {
    const KIND: &'static str = "String";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Value(Value::String(text)) => Some(text.clone()),
            _ => None,
        }
    }
}

impl FromBound for bool {
    const KIND: &'static str = "Bool";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Value(Value::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }
}

impl FromBound for Event {
    const KIND: &'static str = "Event";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Value(Value::Event(event)) => Some(event.clone()),
            _ => None,
        }
    }
}

impl<T: FromBound> FromBound for Vec<T> {
    const KIND: &'static str = "list";

    fn from_bound(bound: &Bound) -> Option<Self> {
        match bound {
            Bound::Many(items) => items.iter().map(T::from_bound).collect(),
            Bound::Value(Value::List(items) | Value::Array(items)) => items
                .iter()
                .map(|item| T::from_bound(&Bound::Value(item.clone())))
                .collect(),
            other => T::from_bound(other).map(|item| vec![item]),
        }
    }
}

/// Arguments bound for one candidate, by name.
#[derive(Clone, Debug, Default)]
pub struct Args {
    entries: SmallVec<[(&'static str, Bound); 4]>,
}

impl Args {
    fn insert(&mut self, name: &'static str, bound: Bound) {
        self.entries.push((name, bound));
    }

    pub fn raw(&self, name: &str) -> Option<&Bound> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, bound)| bound)
    }

    pub fn get<T: FromBound>(&self, name: &str) -> Result<T> {
        let bound = self
            .raw(name)
            .ok_or_else(|| ScenarioError::mismatch(T::KIND, "missing argument", name))?;
        T::from_bound(bound).ok_or_else(|| ScenarioError::mismatch(T::KIND, describe(bound), name))
    }
}

fn describe(bound: &Bound) -> String {
    match bound {
        Bound::Value(value) => value.kind().to_string(),
        Bound::Contract(contract) => format!("contract {}", contract.name),
        Bound::Many(_) => "list".to_string(),
    }
}

type Resolver = Rc<dyn Fn(&World, &Event) -> Result<Bound>>;
type ImplicitResolver = Rc<dyn Fn(&World) -> Result<Bound>>;
type Guard = Rc<dyn Fn(&World, &Args) -> Result<bool>>;

#[derive(Clone)]
enum Source {
    Token(Resolver),
    Implicit(ImplicitResolver),
}

/// Parameter descriptor.
#[derive(Clone)]
pub struct Arg {
    name: &'static str,
    source: Source,
    default: Option<Bound>,
    variadic: bool,
    mapped: bool,
}

impl Arg {
    pub fn new<T, F>(name: &'static str, resolve: F) -> Self
    where
        T: Into<Bound>,
        F: Fn(&World, &Event) -> Result<T> + 'static,
    {
        Arg {
            name,
            source: Source::Token(Rc::new(move |world: &World, event: &Event| {
                resolve(world, event).map(Into::into)
            })),
            default: None,
            variadic: false,
            mapped: false,
        }
    }

    /// An argument read from the world rather than from the line.
    pub fn implicit<T, F>(name: &'static str, resolve: F) -> Self
    where
        T: Into<Bound>,
        F: Fn(&World) -> Result<T> + 'static,
    {
        Arg {
            name,
            source: Source::Implicit(Rc::new(move |world: &World| resolve(world).map(Into::into))),
            default: None,
            variadic: false,
            mapped: false,
        }
    }

    pub fn default(mut self, value: impl Into<Bound>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Variadic, resolving each remaining token on its own.
    pub fn mapped(mut self) -> Self {
        self.variadic = true;
        self.mapped = true;
        self
    }

    fn describe(&self) -> String {
        let mut out = self.name.to_string();
        if matches!(self.source, Source::Implicit(_)) {
            out.insert(0, '@');
        }
        if self.variadic {
            out.push_str("...");
        }
        if self.default.is_some() {
            out.push('?');
        }
        out
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Clone)]
struct Signature {
    name: String,
    description: String,
    args: Vec<Arg>,
    catchall: bool,
    name_pos: usize,
    guard: Option<(String, Guard)>,
}

impl Signature {
    fn new(name: &str, description: &str, args: Vec<Arg>) -> Self {
        Signature {
            name: name.to_string(),
            description: description.to_string(),
            args,
            catchall: false,
            name_pos: 0,
            guard: None,
        }
    }

    fn label(&self) -> String {
        let args: Vec<String> = self.args.iter().map(Arg::describe).collect();
        let mut out = self.name.clone();
        if self.catchall {
            out.push('*');
        }
        if !args.is_empty() {
            out.push(' ');
            out.push_str(&args.join(" "));
        }
        out
    }

    /// `Ok(None)` when the line names a different candidate.
    fn bind(&self, world: &World, event: &Event) -> Result<Option<Args>> {
        let mut tokens: Vec<Event> = event.tokens().to_vec();
        if !self.catchall {
            let named = tokens
                .get(self.name_pos)
                .and_then(Event::as_atom)
                .is_some_and(|text| text.eq_ignore_ascii_case(&self.name));
            if !named {
                return Ok(None);
            }
            tokens.remove(self.name_pos);
        }
        let mut tokens = tokens.into_iter();
        let mut args = Args::default();
        for arg in &self.args {
            let bound = match &arg.source {
                Source::Implicit(resolve) => resolve(world)?,
                Source::Token(resolve) if arg.variadic => {
                    let rest: Vec<Event> = tokens.by_ref().collect();
                    bind_variadic(world, arg, resolve, rest)?
                }
                Source::Token(resolve) => match (tokens.next(), &arg.default) {
                    (Some(token), _) => resolve(world, &token)?,
                    (None, Some(default)) => default.clone(),
                    (None, None) => {
                        return Err(ScenarioError::mismatch(
                            format!("argument `{}`", arg.name),
                            "end of line",
                            event,
                        ));
                    }
                },
            };
            trace!(candidate = %self.name, arg = arg.name, "bound");
            args.insert(arg.name, bound);
        }
        let leftover: Vec<String> = tokens.map(|token| token.to_string()).collect();
        if !leftover.is_empty() {
            return Err(ScenarioError::mismatch(
                "end of line",
                format!("extra token(s) {}", leftover.join(" ")),
                event,
            ));
        }
        if let Some((requirement, guard)) = &self.guard {
            if !guard(world, &args)? {
                return Err(ScenarioError::handler(
                    self.name.clone(),
                    format!("requires {requirement}"),
                ));
            }
        }
        Ok(Some(args))
    }
}

fn bind_variadic(world: &World, arg: &Arg, resolve: &Resolver, rest: Vec<Event>) -> Result<Bound> {
    if rest.is_empty() {
        if let Some(default) = &arg.default {
            return Ok(default.clone());
        }
        if arg.mapped {
            return Ok(Bound::Many(Vec::new()));
        }
        return Err(ScenarioError::mismatch(
            format!("argument `{}`", arg.name),
            "end of line",
            Event::List(rest),
        ));
    }
    if arg.mapped {
        return rest
            .iter()
            .map(|token| resolve(world, token))
            .collect::<Result<Vec<_>>>()
            .map(Bound::Many);
    }
    let event = Event::List(rest).unwrap_single();
    resolve(world, &event)
}

macro_rules! candidate_builders {
    ($($head:tt)*) => {
        $($head)* {
            /// Binds regardless of the leading token; every token is an argument.
            pub fn catchall(mut self) -> Self {
                self.sig.catchall = true;
                self
            }

            /// Position of the name token among the noun's remaining tokens.
            pub fn name_pos(mut self, pos: usize) -> Self {
                self.sig.name_pos = pos;
                self
            }

            /// Extra predicate checked after the arguments bind.
            pub fn when<F>(mut self, requirement: &str, guard: F) -> Self
            where
                F: Fn(&World, &Args) -> Result<bool> + 'static,
            {
                self.sig.guard = Some((requirement.to_string(), Rc::new(guard)));
                self
            }

            pub fn name(&self) -> &str {
                &self.sig.name
            }

            pub fn description(&self) -> &str {
                &self.sig.description
            }

            pub fn label(&self) -> String {
                self.sig.label()
            }
        }
    };
}

type FetchHandler<R> = Rc<dyn Fn(&World, Args) -> Result<R>>;
type CommandHandler = Rc<dyn Fn(&World, Address, Args) -> Result<World>>;

/// A read-only candidate producing `R`.
pub struct Fetcher<R> {
    sig: Signature,
    handler: FetchHandler<R>,
}

impl<R> Fetcher<R> {
    pub fn new<F>(name: &str, description: &str, args: Vec<Arg>, handler: F) -> Self
    where
        F: Fn(&World, Args) -> Result<R> + 'static,
    {
        Fetcher {
            sig: Signature::new(name, description, args),
            handler: Rc::new(handler),
        }
    }
}

candidate_builders!(impl<R> Fetcher<R>);

/// A state-changing candidate; the handler returns the next world.
pub struct Command {
    sig: Signature,
    handler: CommandHandler,
}

impl Command {
    pub fn new<F>(name: &str, description: &str, args: Vec<Arg>, handler: F) -> Self
    where
        F: Fn(&World, Address, Args) -> Result<World> + 'static,
    {
        Command {
            sig: Signature::new(name, description, args),
            handler: Rc::new(handler),
        }
    }
}

candidate_builders!(impl Command);

fn no_match(op: &str, event: &Event, attempts: Vec<Attempt>, available: Vec<String>) -> ScenarioError {
    ScenarioError::NoMatchingCandidate {
        op: op.to_string(),
        event: event.to_string(),
        attempts,
        available,
    }
}

fn attempt(sig: &Signature, err: &ScenarioError) -> Attempt {
    Attempt {
        candidate: sig.label(),
        reason: err.to_string(),
    }
}

/// Resolves `event` against `fetchers` and returns the first binding candidate's result.
pub fn get_fetcher_value<R>(op: &str, fetchers: &[Fetcher<R>], world: &World, event: &Event) -> Result<R> {
    let mut attempts = Vec::new();
    for fetcher in fetchers {
        match fetcher.sig.bind(world, event) {
            Ok(Some(args)) => {
                debug!(op, candidate = %fetcher.sig.name, "fetching");
                return (fetcher.handler)(world, args);
            }
            Ok(None) => {}
            Err(err) => attempts.push(attempt(&fetcher.sig, &err)),
        }
    }
    let available = fetchers.iter().map(|f| f.sig.label()).collect();
    Err(no_match(op, event, attempts, available))
}

/// Resolves `event` against `commands` and runs the first binding candidate as `from`.
pub fn process_command_event(
    op: &str,
    commands: &[Command],
    world: &World,
    event: &Event,
    from: Address,
) -> Result<World> {
    let mut attempts = Vec::new();
    for command in commands {
        match command.sig.bind(world, event) {
            Ok(Some(args)) => {
                debug!(op, candidate = %command.sig.name, %from, "running command");
                return (command.handler)(world, from, args);
            }
            Ok(None) => {}
            Err(err) => attempts.push(attempt(&command.sig, &err)),
        }
    }
    let available = commands.iter().map(|c| c.sig.label()).collect();
    Err(no_match(op, event, attempts, available))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::parser::parse_event;
    use crate::printer::BufferPrinter;
    use crate::value::Value;

    fn world() -> World {
        World::new(
            "development",
            ".",
            Rc::new(MemoryChain::new(1)),
            Rc::new(BufferPrinter::new()),
        )
    }

    fn number(_: &World, event: &Event) -> Result<Number> {
        let text = event
            .as_atom()
            .ok_or_else(|| ScenarioError::mismatch("Number", "list", event))?;
        Number::parse(text).ok_or_else(|| ScenarioError::mismatch("Number", "text", event))
    }

    fn string(_: &World, event: &Event) -> Result<String> {
        Ok(event.to_string())
    }

    fn specific() -> Fetcher<String> {
        Fetcher::new("Pair", "", vec![Arg::new("a", number), Arg::new("b", number)], |_, args| {
            Ok(format!("pair {}", args.get::<Number>("a")?))
        })
    }

    fn fallback() -> Fetcher<String> {
        Fetcher::new("Anything", "", vec![Arg::new("rest", string).variadic()], |_, args| {
            Ok(format!("fallback {}", args.get::<String>("rest")?))
        })
        .catchall()
    }

    #[test]
    fn declaration_order_decides_between_overlapping_candidates() -> Result<()> {
        let event = parse_event("Pair 1 2")?;
        let specific_first = [specific(), fallback()];
        assert_eq!(get_fetcher_value("Thing", &specific_first, &world(), &event)?, "pair 1");
        let fallback_first = [fallback(), specific()];
        assert_eq!(
            get_fetcher_value("Thing", &fallback_first, &world(), &event)?,
            "fallback (Pair 1 2)"
        );
        Ok(())
    }

    #[test]
    fn defaults_fill_missing_trailing_args() -> Result<()> {
        let fetchers = [Fetcher::new(
            "Scaled",
            "",
            vec![Arg::new("a", number), Arg::new("b", number).default(Number::from_integer(7))],
            |_, args| Ok(args.get::<Number>("b")?.to_string()),
        )];
        assert_eq!(get_fetcher_value("Scaled", &fetchers, &world(), &parse_event("Scaled 1")?)?, "7");
        assert_eq!(get_fetcher_value("Scaled", &fetchers, &world(), &parse_event("scaled 1 3")?)?, "3");
        Ok(())
    }

    #[test]
    fn mapped_variadics_resolve_each_token() -> Result<()> {
        let fetchers = [Fetcher::new("Sum", "", vec![Arg::new("xs", number).mapped()], |_, args| {
            let xs: Vec<Number> = args.get("xs")?;
            Ok(xs.iter().filter_map(Number::to_u64).sum::<u64>())
        })];
        assert_eq!(get_fetcher_value("Sum", &fetchers, &world(), &parse_event("Sum 1 2 3")?)?, 6);
        assert_eq!(get_fetcher_value("Sum", &fetchers, &world(), &parse_event("Sum")?)?, 0);
        Ok(())
    }

    #[test]
    fn implicit_args_consume_no_tokens() -> Result<()> {
        let fetchers = [Fetcher::new(
            "Net",
            "",
            vec![
                Arg::implicit("network", |world: &World| Ok(world.network().to_string())),
                Arg::new("x", number),
            ],
            |_, args| args.get::<String>("network"),
        )];
        assert_eq!(get_fetcher_value("Net", &fetchers, &world(), &parse_event("Net 5")?)?, "development");
        Ok(())
    }

    #[test]
    fn name_position_skips_leading_args() -> Result<()> {
        let fetchers = [Fetcher::new(
            "Balance",
            "",
            vec![Arg::new("token", string), Arg::new("amount", number)],
            |_, args| args.get::<String>("token"),
        )
        .name_pos(1)];
        let event = parse_event("ZRX Balance 4")?;
        assert_eq!(get_fetcher_value("Erc20", &fetchers, &world(), &event)?, "ZRX");
        Ok(())
    }

    #[test]
    fn failures_name_every_attempt() -> Result<()> {
        let fetchers = [specific(), Fetcher::new("Other", "", vec![], |_, _| Ok(String::new()))];
        let err = match get_fetcher_value("Thing", &fetchers, &world(), &parse_event("Pair 1 x")?) {
            Err(err) => err,
            Ok(value) => panic!("bound unexpectedly: {value}"),
        };
        assert!(err.is_resolution());
        match &err {
            ScenarioError::NoMatchingCandidate { attempts, available, .. } => {
                assert_eq!(attempts.len(), 1);
                assert!(attempts[0].candidate.starts_with("Pair"));
                assert_eq!(available.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("no matching Thing"));
        Ok(())
    }

    #[test]
    fn leftover_tokens_and_guards_reject_candidates() -> Result<()> {
        let guarded = Fetcher::new("Flag", "", vec![], |_, _| Ok(Value::Bool(true)))
            .when("a test network", |world, _| Ok(world.network() == "test"));
        let fetchers = [guarded];
        assert!(get_fetcher_value("Flag", &fetchers, &world(), &parse_event("Flag")?).is_err());
        assert!(get_fetcher_value("Flag", &fetchers, &world(), &parse_event("Flag 1")?).is_err());
        Ok(())
    }

    #[test]
    fn handler_errors_propagate_unwrapped() -> Result<()> {
        let commands = [Command::new("Boom", "", vec![], |_, _, _| {
            Err(ScenarioError::handler("Boom", "reverted"))
        })];
        let err = match process_command_event("Test", &commands, &world(), &parse_event("Boom")?, Address::ZERO) {
            Err(err) => err,
            Ok(_) => panic!("command should fail"),
        };
        assert_eq!(err, ScenarioError::handler("Boom", "reverted"));
        Ok(())
    }
}
