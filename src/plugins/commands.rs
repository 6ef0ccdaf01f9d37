//! Chat command triggers.
//!
//! A plugin declares a trigger prefix and a table of command words. Every
//! channel message starting with the prefix is split into a word and an
//! argument remainder; a matching command runs with the sender, the
//! channel and the arguments. The table is an ordinary `message`
//! subscriber.

use anyhow::Context;
use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use crate::error::ConnectionError;
use crate::events::Event;
use crate::network::NetworkHandle;
use crate::state::{Channel, User};

/// Prefix used when a plugin does not set its own.
pub const DEFAULT_TRIGGER: &str = ".";

/// What a command handler receives.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub network: NetworkHandle,
    pub channel: Channel,
    pub user: User,
    /// Text after the command word, leading whitespace removed.
    pub args: String,
}

impl Invocation {
    /// Answer in the channel the command came from.
    pub fn reply(&self, text: &str) -> Result<(), ConnectionError> {
        self.network.say(&self.channel.name, text)
    }
}

pub type CommandHandler = Arc<dyn Fn(&Invocation) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
struct Command {
    handler: CommandHandler,
    location: &'static Location<'static>,
}

/// Trigger prefix plus the command words a plugin answers to.
#[derive(Clone)]
pub struct CommandTable {
    prefix: String,
    commands: HashMap<String, Command>,
    first_declared: Option<&'static Location<'static>>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER)
    }
}

impl CommandTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: HashMap::new(),
            first_declared: None,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// Register `name` and its aliases. A later registration of the same
    /// word replaces the earlier one.
    pub fn insert(
        &mut self,
        name: &str,
        aliases: &[&str],
        handler: CommandHandler,
        location: &'static Location<'static>,
    ) {
        self.first_declared.get_or_insert(location);
        for word in std::iter::once(&name).chain(aliases) {
            self.commands.insert(
                word.to_string(),
                Command {
                    handler: handler.clone(),
                    location,
                },
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered words, aliases included, sorted.
    pub fn words(&self) -> Vec<String> {
        let mut words: Vec<_> = self.commands.keys().cloned().collect();
        words.sort();
        words
    }

    /// Where the first command was declared.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.first_declared
    }

    /// Run the command a message event names, if any.
    pub fn dispatch(&self, event: &Event) -> anyhow::Result<()> {
        let Event::Message {
            network,
            channel,
            user,
            text,
        } = event
        else {
            return Ok(());
        };
        let Some((word, args)) = parse_trigger(&self.prefix, text) else {
            return Ok(());
        };
        let Some(command) = self.commands.get(&word) else {
            return Ok(());
        };

        let invocation = Invocation {
            network: network.clone(),
            channel: channel.clone(),
            user: user.clone(),
            args: args.to_string(),
        };
        (command.handler)(&invocation)
            .with_context(|| format!("command {word} declared at {}", command.location))
    }
}

/// Split `text` into a sanitized command word and the argument remainder.
///
/// Returns `None` when the text does not start with `prefix` or the word is
/// empty after removing non-word characters.
pub fn parse_trigger<'a>(prefix: &str, text: &'a str) -> Option<(String, &'a str)> {
    let rest = text.strip_prefix(prefix)?;
    let (word, args) = match rest.split_once(char::is_whitespace) {
        Some((word, args)) => (word, args.trim_start()),
        None => (rest, ""),
    };
    let word: String = word
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!word.is_empty()).then_some((word, args))
}
