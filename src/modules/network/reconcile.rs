//! Declarative reconciliation of device resources.
//!
//! Given what the caller wants and what the device reports, [`reconcile`]
//! produces the ordered commands that close the gap. It never touches the
//! device; running the commands is up to the caller.
//!
//! Comparison is a set difference over flattened `(attribute, value)` pairs:
//! every desired pair that the observed resource lacks, or holds with another
//! value, lands in the [`Delta`]. Values compare case-sensitively.

use crate::modules::ModuleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Desired attributes missing from or different on the device.
pub type Delta<A> = BTreeMap<A, String>;

/// Whether the resource should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Present => write!(f, "present"),
            DesiredState::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for DesiredState {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "present" => Ok(DesiredState::Present),
            "absent" => Ok(DesiredState::Absent),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid state '{}'. Valid options: present, absent",
                s
            ))),
        }
    }
}

/// Ordered device commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSet(Vec<String>);

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.0.push(command.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for CommandSet {
    fn from(commands: Vec<String>) -> Self {
        Self(commands)
    }
}

impl<'a> IntoIterator for &'a CommandSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A named device resource that can be reconciled.
///
/// Implementations own the translation from attribute changes to CLI.
pub trait ManagedResource {
    /// Attribute keys, ordered the way commands should be emitted.
    type Attribute: Ord + Copy + fmt::Debug;

    /// The attribute that names the resource.
    const IDENTITY: Self::Attribute;

    /// The resource name as spelled in this description.
    fn identity(&self) -> &str;

    /// Present attributes, identity included, rendered as strings.
    fn attributes(&self) -> BTreeMap<Self::Attribute, String>;

    /// Commands that create or update the resource with the given changes.
    fn configure_commands(identity: &str, delta: &Delta<Self::Attribute>) -> CommandSet;

    /// Commands that remove the resource.
    fn remove_commands(identity: &str) -> CommandSet;
}

/// Desired pairs not matched exactly by the observed resource.
pub fn compute_delta<R: ManagedResource>(desired: &R, observed: &R) -> Delta<R::Attribute> {
    let have = observed.attributes();
    desired
        .attributes()
        .into_iter()
        .filter(|(key, value)| have.get(key) != Some(value))
        .collect()
}

/// Commands moving the device from `observed` to `desired` under `intent`.
pub fn reconcile<R: ManagedResource>(
    desired: &R,
    observed: Option<&R>,
    intent: DesiredState,
) -> CommandSet {
    match (intent, observed) {
        (DesiredState::Absent, Some(existing)) => R::remove_commands(existing.identity()),
        (DesiredState::Absent, None) => CommandSet::new(),
        (DesiredState::Present, None) => {
            R::configure_commands(desired.identity(), &desired.attributes())
        }
        (DesiredState::Present, Some(existing)) => {
            let delta = compute_delta(desired, existing);
            // A differing identity means the names did not line up; never
            // issue a configuration block under either spelling.
            if delta.is_empty() || delta.contains_key(&R::IDENTITY) {
                CommandSet::new()
            } else {
                R::configure_commands(existing.identity(), &delta)
            }
        }
    }
}
