//! Invocation context handed to command packages

use crate::error::{FancyError, FancyResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key dropped from options before they cross the process boundary
pub const PARENT_KEY: &str = "parent";

/// Prefix marking internal option keys
pub const INTERNAL_PREFIX: char = '_';

/// Options record of a command call (`--force`, `--name=x`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationOptions {
    flags: BTreeMap<String, Value>,
}

impl InvocationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.flags.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.flags.get(key)
    }

    /// A boolean flag; missing and non-boolean values read as false
    pub fn flag(&self, key: &str) -> bool {
        self.flags.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Own, non-internal options as a JSON object
    pub fn sanitized(&self) -> Map<String, Value> {
        self.flags
            .iter()
            .filter(|(key, _)| !key.starts_with(INTERNAL_PREFIX) && key.as_str() != PARENT_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// A full command call: positional arguments plus options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationContext {
    pub args: Vec<String>,
    pub options: InvocationOptions,
}

impl InvocationContext {
    pub fn new(args: Vec<String>, options: InvocationOptions) -> Self {
        Self { args, options }
    }

    /// Split a raw argument list whose last element is the options object
    pub fn from_raw(mut raw: Vec<Value>) -> FancyResult<Self> {
        let options = match raw.pop() {
            Some(Value::Object(map)) => InvocationOptions {
                flags: map.into_iter().collect(),
            },
            Some(other) => {
                return Err(FancyError::User(format!(
                    "expected an options object as the last argument, got {}",
                    other
                )))
            }
            None => return Err(FancyError::User("argument list is empty".to_string())),
        };

        let args = raw
            .into_iter()
            .filter(|value| !value.is_null())
            .map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();

        Ok(Self { args, options })
    }

    /// Raw argument list: positional arguments then the options object
    pub fn to_raw(&self) -> Vec<Value> {
        let mut raw: Vec<Value> = self.args.iter().cloned().map(Value::String).collect();
        raw.push(Value::Object(self.options.flags.clone().into_iter().collect()));
        raw
    }

    /// Argument list sent to the command package, internal options removed
    pub fn call_args(&self) -> Vec<Value> {
        let mut call: Vec<Value> = self.args.iter().cloned().map(Value::String).collect();
        call.push(Value::Object(self.options.sanitized()));
        call
    }
}
