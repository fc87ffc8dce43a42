//! Configuration staging and dirty tracking.
//!
//! The server's configuration tree is the baseline; the tracker mirrors it
//! into an editable draft and records which dotted paths have diverged. A
//! field edited back to its baseline value leaves the dirty set again. The
//! only way to apply a draft is a full simulation reset, so "commit" lives on
//! the sync controller; this tracker just knows whether there is anything to
//! commit.

use crate::keypath;
use serde_json::Value;
use std::collections::BTreeSet;

/// Path of the variable-length publisher list inside the config tree.
pub const PUBLISHERS_PATH: &str = "SIMULATION.PUBLISHERS";

/// Declared type of an editable config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Enum(&'static [&'static str]),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Enum(_) => "enum",
        }
    }
}

/// One editable field: its name, optional group prefix, type, and an
/// operator-facing description.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: Option<&'static str>,
    pub kind: FieldKind,
    pub desc: &'static str,
}

impl FieldSpec {
    /// The full dotted path this field addresses.
    pub fn path(&self) -> String {
        match self.group {
            Some(group) => format!("{group}.{}", self.name),
            None => self.name.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unknown config field: {0}")]
    UnknownField(String),
    #[error("invalid {kind} value for {path}: {raw:?}")]
    Invalid {
        path: String,
        kind: &'static str,
        raw: String,
    },
    #[error("config path does not exist: {0}")]
    MissingPath(String),
    #[error("no publisher at index {0}")]
    NoSuchPublisher(usize),
    #[error("no configuration loaded")]
    NotLoaded,
}

/// Whether an accepted edit left the field diverged from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Dirty,
    Clean,
}

/// Operator intent against the staged configuration.
#[derive(Debug, Clone)]
pub enum ConfigCommand {
    Set { path: String, raw: String },
    AddPublisher,
    RemovePublisher { index: usize },
}

/// Staged configuration state: server baseline, editable draft, dirty paths.
#[derive(Debug)]
pub struct ConfigTracker {
    fields: Vec<FieldSpec>,
    publisher_fields: Vec<FieldSpec>,
    publisher_default: Value,
    baseline: Value,
    draft: Value,
    changed: BTreeSet<String>,
    loaded: bool,
}

impl ConfigTracker {
    pub fn new(
        fields: Vec<FieldSpec>,
        publisher_fields: Vec<FieldSpec>,
        publisher_default: Value,
    ) -> Self {
        Self {
            fields,
            publisher_fields,
            publisher_default,
            baseline: Value::Null,
            draft: Value::Null,
            changed: BTreeSet::new(),
            loaded: false,
        }
    }

    /// Adopt a freshly fetched configuration as the new baseline and draft,
    /// dropping any staged edits.
    pub fn load(&mut self, config: Value) {
        self.draft = config.clone();
        self.baseline = config;
        self.changed.clear();
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    pub fn draft(&self) -> &Value {
        &self.draft
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn publisher_fields(&self) -> &[FieldSpec] {
        &self.publisher_fields
    }

    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    /// True iff anything is staged, i.e. the commit affordance is shown.
    pub fn dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Single entry point for operator intents.
    pub fn apply(&mut self, command: ConfigCommand) -> Result<SetOutcome, InputError> {
        match command {
            ConfigCommand::Set { path, raw } => self.set(&path, &raw),
            ConfigCommand::AddPublisher => {
                self.add_publisher()?;
                Ok(SetOutcome::Dirty)
            }
            ConfigCommand::RemovePublisher { index } => {
                self.remove_publisher(index)?;
                Ok(SetOutcome::Dirty)
            }
        }
    }

    /// Stage one field edit.
    ///
    /// The raw input is coerced per the field's declared type; a coercion
    /// failure rejects the edit and leaves the draft at its last valid value.
    /// On success the draft is mutated and the dirty set updated by comparing
    /// against the baseline.
    pub fn set(&mut self, path: &str, raw: &str) -> Result<SetOutcome, InputError> {
        if !self.loaded {
            return Err(InputError::NotLoaded);
        }
        let kind = self
            .spec_for(path)
            .ok_or_else(|| InputError::UnknownField(path.to_string()))?;
        let value = coerce(path, kind, raw)?;

        if !keypath::set(&mut self.draft, path, value.clone()) {
            return Err(InputError::MissingPath(path.to_string()));
        }

        let baseline = keypath::resolve(&self.baseline, path);
        if baseline.is_some_and(|b| value_eq(b, &value)) {
            self.changed.remove(path);
            Ok(SetOutcome::Clean)
        } else {
            self.changed.insert(path.to_string());
            Ok(SetOutcome::Dirty)
        }
    }

    /// Append a publisher record built from the catalog defaults.
    pub fn add_publisher(&mut self) -> Result<usize, InputError> {
        let record = self.publisher_default.clone();
        let list = self.publishers_mut()?;
        list.push(record);
        let index = list.len() - 1;
        self.mark_publishers_changed();
        Ok(index)
    }

    /// Remove a publisher; remaining entries renumber implicitly (display
    /// indices are positional).
    pub fn remove_publisher(&mut self, index: usize) -> Result<(), InputError> {
        let list = self.publishers_mut()?;
        if index >= list.len() {
            return Err(InputError::NoSuchPublisher(index));
        }
        list.remove(index);
        self.mark_publishers_changed();
        Ok(())
    }

    /// Publisher records with their contiguous zero-based display indices.
    pub fn publishers(&self) -> Vec<(usize, &Value)> {
        match keypath::resolve(&self.draft, PUBLISHERS_PATH) {
            Some(Value::Array(items)) => items.iter().enumerate().collect(),
            _ => Vec::new(),
        }
    }

    fn publishers_mut(&mut self) -> Result<&mut Vec<Value>, InputError> {
        if !self.loaded {
            return Err(InputError::NotLoaded);
        }
        match self
            .draft
            .pointer_mut("/SIMULATION/PUBLISHERS")
            .and_then(Value::as_array_mut)
        {
            Some(list) => Ok(list),
            None => Err(InputError::MissingPath(PUBLISHERS_PATH.to_string())),
        }
    }

    /// Structural edits invalidate per-publisher indices, so per-publisher
    /// dirty paths are folded into the list-level entry.
    fn mark_publishers_changed(&mut self) {
        let prefix = format!("{PUBLISHERS_PATH}.");
        self.changed.retain(|k| !k.starts_with(&prefix));
        self.changed.insert(PUBLISHERS_PATH.to_string());
    }

    fn spec_for(&self, path: &str) -> Option<FieldKind> {
        if let Some(rest) = path.strip_prefix(&format!("{PUBLISHERS_PATH}.")) {
            let mut parts = rest.splitn(2, '.');
            let index = parts.next()?;
            let field = parts.next()?;
            if index.parse::<usize>().is_err() || field.contains('.') {
                return None;
            }
            return self
                .publisher_fields
                .iter()
                .find(|f| f.name == field)
                .map(|f| f.kind);
        }
        self.fields
            .iter()
            .find(|f| f.path() == path)
            .map(|f| f.kind)
    }
}

fn coerce(path: &str, kind: FieldKind, raw: &str) -> Result<Value, InputError> {
    let invalid = || InputError::Invalid {
        path: path.to_string(),
        kind: kind.name(),
        raw: raw.to_string(),
    };
    let raw = raw.trim();
    match kind {
        FieldKind::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::from)
            .ok_or_else(invalid),
        FieldKind::Enum(choices) => {
            if choices.contains(&raw) {
                Ok(Value::from(raw))
            } else {
                Err(invalid())
            }
        }
    }
}

/// Baseline comparison. Numbers compare by value so an integer edit of `100`
/// matches a baseline `100.0`.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}
