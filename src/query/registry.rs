//! Command registry - maps command names to descriptors

use super::commands::register_builtins;
use super::descriptor::CommandDescriptor;
use super::dsl;
use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::reql::{Normalizer, Options, Term, Value};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, error, instrument, trace};

#[derive(Default)]
struct Entries {
    commands: HashMap<String, CommandDescriptor>,
    /// alias -> canonical command name
    aliases: HashMap<String, String>,
}

impl Entries {
    fn lookup(&self, name: &str) -> Option<CommandDescriptor> {
        if let Some(descriptor) = self.commands.get(name) {
            return Some(*descriptor);
        }
        self.aliases
            .get(name)
            .and_then(|target| self.commands.get(target))
            .copied()
    }
}

/// Command registry
///
/// Registration is expected once at startup; afterwards the registry is
/// read-mostly and safe to share between threads.
pub struct CommandRegistry {
    entries: RwLock<Entries>,
    normalizer: Normalizer,
    allow_redefinition: bool,
}

impl CommandRegistry {
    /// Empty registry with the default normalizer.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            normalizer: Normalizer::default(),
            allow_redefinition: true,
        }
    }

    /// Registry pre-populated with every builtin command and alias.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        // an empty registry that allows redefinition accepts every builtin
        if let Err(err) = register_builtins(&registry) {
            error!(%err, "Builtin catalogue rejected");
        }
        registry
    }

    /// Builtin registry using the normalizer and redefinition policy from `config`.
    pub fn from_config(config: &BuilderConfig) -> Result<Self> {
        config.validate()?;
        let registry = Self {
            entries: RwLock::new(Entries::default()),
            normalizer: config.normalizer(),
            allow_redefinition: config.allow_redefinition,
        };
        register_builtins(&registry)?;
        Ok(registry)
    }

    /// Register a command under its own name. An existing entry is replaced
    /// and returned, unless redefinition is disabled.
    pub fn register(&self, descriptor: CommandDescriptor) -> Result<Option<CommandDescriptor>> {
        let mut entries = self.entries.write();
        let name = descriptor.name;

        if !self.allow_redefinition
            && (entries.commands.contains_key(name) || entries.aliases.contains_key(name))
        {
            return Err(Error::Registry(format!(
                "Command '{}' already registered",
                name
            )));
        }

        entries.aliases.remove(name);
        let previous = entries.commands.insert(name.to_string(), descriptor);
        trace!(command = name, replaced = previous.is_some(), "Registered command");
        Ok(previous)
    }

    /// Make `alias` resolve to the command currently named `target`.
    pub fn alias(&self, alias: &str, target: &str) -> Result<()> {
        let mut entries = self.entries.write();

        if !entries.commands.contains_key(target) {
            return Err(Error::Registry(format!(
                "Cannot alias '{}' to unknown command '{}'",
                alias, target
            )));
        }
        if entries.commands.contains_key(alias)
            || (!self.allow_redefinition && entries.aliases.contains_key(alias))
        {
            return Err(Error::Registry(format!("Name '{}' already registered", alias)));
        }

        entries.aliases.insert(alias.to_string(), target.to_string());
        trace!(alias = alias, command = target, "Registered alias");
        Ok(())
    }

    /// Unregister a command, dropping any aliases pointing at it.
    pub fn unregister(&self, name: &str) -> Result<CommandDescriptor> {
        let mut entries = self.entries.write();

        if let Some(target) = entries.aliases.remove(name) {
            trace!(alias = name, "Unregistered alias");
            return entries
                .commands
                .get(&target)
                .copied()
                .ok_or_else(|| Error::Registry(format!("Command '{}' not found", target)));
        }

        let removed = entries
            .commands
            .remove(name)
            .ok_or_else(|| Error::Registry(format!("Command '{}' not found", name)))?;
        entries.aliases.retain(|_, target| target != name);
        debug!(command = name, "Unregistered command");
        Ok(removed)
    }

    /// Look up a command by exact name, then with `-` folded to `_`.
    pub fn get(&self, name: &str) -> Option<CommandDescriptor> {
        let entries = self.entries.read();
        entries.lookup(name).or_else(|| {
            if name.contains('-') && name.len() > 1 {
                entries.lookup(&name.replace('-', "_"))
            } else {
                None
            }
        })
    }

    /// [`CommandRegistry::get`], failing with a registry error.
    pub fn resolve(&self, name: &str) -> Result<CommandDescriptor> {
        self.get(name)
            .ok_or_else(|| Error::Registry(format!("Unknown command '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Canonical command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Aliases pointing at `name`, sorted.
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .entries
            .read()
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }

    pub fn len(&self) -> usize {
        self.entries.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Invoke a command by name.
    #[instrument(skip(self, args, options), fields(arg_count = args.len()))]
    pub fn dispatch(&self, name: &str, args: Vec<Value>, options: Options) -> Result<Term> {
        let descriptor = self.resolve(name)?;
        trace!(command = descriptor.name, "Dispatching");
        descriptor.construct(&self.normalizer, args, options)
    }

    /// Build a term from its textual expression form.
    #[instrument(skip(self))]
    pub fn build(&self, text: &str) -> Result<Term> {
        let term = dsl::build(self, text)?;
        debug!(nodes = term.node_count(), "Built term");
        Ok(term)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref GLOBAL: CommandRegistry = CommandRegistry::with_builtins();
}

/// Process-wide registry holding the builtin commands.
pub fn global() -> &'static CommandRegistry {
    &GLOBAL
}
