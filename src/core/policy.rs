//! Policy argument validation and staging.
//!
//! Each policy kind declares a typed, min-bounded argument list. The operator
//! edits per-policy argument values; invalid fields block submission for that
//! policy instance only. Validated invocations are grouped by the step at
//! which they were queued — grouping is purely a display concern, every
//! invocation is submitted to the server individually and immediately.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Float,
}

/// Declared shape of one policy argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub min: Option<f64>,
    pub default: f64,
}

/// One enactable policy kind.
#[derive(Debug, Clone)]
pub struct PolicySpec {
    pub name: &'static str,
    pub desc: &'static str,
    pub args: Vec<ArgSpec>,
}

/// A named argument value inside a staged invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgValue {
    pub name: String,
    pub value: f64,
}

/// One validated policy invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyInvocation {
    pub name: String,
    pub args: Vec<ArgValue>,
}

impl PolicyInvocation {
    /// Argument values in declaration order — the server wire shape.
    pub fn values(&self) -> Vec<f64> {
        self.args.iter().map(|a| a.value).collect()
    }
}

/// Invocations queued at one step, kept for display grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBatch {
    pub step: u64,
    pub invocations: Vec<PolicyInvocation>,
}

/// A policy the server reports as already enacted.
///
/// The payload shape is loosely specified, so arguments stay untyped and
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnactedPolicy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
    #[error("policy {policy} has no argument {index}")]
    NoSuchArg { policy: String, index: usize },
    #[error("policy {policy} has invalid arguments: {names}")]
    InvalidArgs { policy: String, names: String },
}

/// Result of editing one argument field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgOutcome {
    Valid,
    Invalid,
}

#[derive(Debug)]
struct PolicyForm {
    spec: PolicySpec,
    values: Vec<f64>,
    invalid: BTreeSet<usize>,
}

/// Per-policy editable forms plus the step-grouped queue of staged
/// invocations.
#[derive(Debug)]
pub struct PolicyTracker {
    forms: Vec<PolicyForm>,
    batches: Vec<PolicyBatch>,
    enacted: Vec<EnactedPolicy>,
}

impl PolicyTracker {
    pub fn new(specs: Vec<PolicySpec>) -> Self {
        let forms = specs
            .into_iter()
            .map(|spec| {
                let values = spec.args.iter().map(|a| a.default).collect();
                PolicyForm {
                    spec,
                    values,
                    invalid: BTreeSet::new(),
                }
            })
            .collect();
        Self {
            forms,
            batches: Vec::new(),
            enacted: Vec::new(),
        }
    }

    /// Seed previously enacted policies fetched from the server.
    pub fn load(&mut self, enacted: Vec<EnactedPolicy>) {
        self.enacted = enacted;
    }

    pub fn enacted(&self) -> &[EnactedPolicy] {
        &self.enacted
    }

    pub fn specs(&self) -> impl Iterator<Item = &PolicySpec> {
        self.forms.iter().map(|f| &f.spec)
    }

    pub fn values(&self, policy: &str) -> Option<&[f64]> {
        self.form(policy).map(|f| f.values.as_slice())
    }

    /// True iff every argument of this policy's form holds a valid value.
    pub fn is_valid(&self, policy: &str) -> bool {
        self.form(policy).is_some_and(|f| f.invalid.is_empty())
    }

    /// Edit one argument field.
    ///
    /// Coerces per the declared type and checks the lower bound. An invalid
    /// input marks the field (blocking submission for this policy only) and
    /// leaves the stored value at its last valid state.
    pub fn edit(&mut self, policy: &str, arg: usize, raw: &str) -> Result<ArgOutcome, PolicyError> {
        let form = self
            .form_mut(policy)
            .ok_or_else(|| PolicyError::UnknownPolicy(policy.to_string()))?;
        let spec = *form.spec.args.get(arg).ok_or_else(|| PolicyError::NoSuchArg {
            policy: policy.to_string(),
            index: arg,
        })?;

        let parsed = match spec.kind {
            ArgKind::Int => raw.trim().parse::<i64>().ok().map(|v| v as f64),
            ArgKind::Float => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        };
        match parsed {
            Some(value) if spec.min.is_none_or(|min| value >= min) => {
                form.values[arg] = value;
                form.invalid.remove(&arg);
                Ok(ArgOutcome::Valid)
            }
            _ => {
                form.invalid.insert(arg);
                Ok(ArgOutcome::Invalid)
            }
        }
    }

    /// Stage a validated invocation for `step`.
    ///
    /// Refuses if any field of this policy's form is invalid. The invocation
    /// joins the batch for `step` (opening a new batch iff the newest batch is
    /// for a different step) and is returned for immediate submission.
    pub fn stage(&mut self, policy: &str, step: u64) -> Result<PolicyInvocation, PolicyError> {
        let form = self
            .form(policy)
            .ok_or_else(|| PolicyError::UnknownPolicy(policy.to_string()))?;
        if !form.invalid.is_empty() {
            let names = form
                .invalid
                .iter()
                .filter_map(|&i| form.spec.args.get(i).map(|a| a.name))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PolicyError::InvalidArgs {
                policy: policy.to_string(),
                names,
            });
        }

        let invocation = PolicyInvocation {
            name: form.spec.name.to_string(),
            args: form
                .spec
                .args
                .iter()
                .zip(&form.values)
                .map(|(a, &value)| ArgValue {
                    name: a.name.to_string(),
                    value,
                })
                .collect(),
        };

        match self.batches.last_mut() {
            Some(batch) if batch.step == step => batch.invocations.push(invocation.clone()),
            _ => self.batches.push(PolicyBatch {
                step,
                invocations: vec![invocation.clone()],
            }),
        }
        Ok(invocation)
    }

    pub fn batches(&self) -> &[PolicyBatch] {
        &self.batches
    }

    fn form(&self, policy: &str) -> Option<&PolicyForm> {
        self.forms.iter().find(|f| f.spec.name == policy)
    }

    fn form_mut(&mut self, policy: &str) -> Option<&mut PolicyForm> {
        self.forms.iter_mut().find(|f| f.spec.name == policy)
    }
}
