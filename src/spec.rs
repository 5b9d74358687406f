//! Data-only matcher descriptors.
//!
//! A [`MatcherSpec`] describes a builder's matcher sequence without holding
//! any live matcher state. Its JSON form is
//! `{"version": 1, "items": [["tm", {"threshold": 0.9, "method": "TM_CCOEFF_NORMED"}]]}`.

use crate::util::{AutoEditError, AutoEditResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only descriptor version this crate reads and writes.
pub const SPEC_VERSION: u32 = 1;

/// A scalar matcher parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Parameters of one matcher, keyed by name.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// One `(kind, params)` entry of a descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecItem(pub String, pub ParamMap);

impl SpecItem {
    /// Returns the matcher kind tag ("tm", "hash", "sift").
    pub fn kind(&self) -> &str {
        &self.0
    }

    /// Returns the parameter map.
    pub fn params(&self) -> &ParamMap {
        &self.1
    }

    fn param(&self, key: &str) -> AutoEditResult<&ParamValue> {
        self.1.get(key).ok_or_else(|| {
            AutoEditError::MalformedSpec(format!("{} item is missing `{key}`", self.0))
        })
    }

    /// Reads a required numeric parameter.
    pub fn f64_param(&self, key: &str) -> AutoEditResult<f64> {
        match self.param(key)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(self.type_error(key, "number", other)),
        }
    }

    /// Reads a required non-negative integer parameter.
    pub fn usize_param(&self, key: &str) -> AutoEditResult<usize> {
        match self.param(key)? {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(self.type_error(key, "non-negative integer", other)),
        }
    }

    /// Reads an optional non-negative integer parameter.
    pub fn usize_param_or(&self, key: &str, default: usize) -> AutoEditResult<usize> {
        if self.1.contains_key(key) {
            self.usize_param(key)
        } else {
            Ok(default)
        }
    }

    /// Reads a required string parameter.
    pub fn str_param(&self, key: &str) -> AutoEditResult<&str> {
        match self.param(key)? {
            ParamValue::Text(v) => Ok(v),
            other => Err(self.type_error(key, "string", other)),
        }
    }

    fn type_error(&self, key: &str, expected: &str, got: &ParamValue) -> AutoEditError {
        AutoEditError::MalformedSpec(format!(
            "{} item `{key}` should be a {expected}, got {got:?}",
            self.0
        ))
    }
}

/// Versioned, data-only description of a matcher chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatcherSpec {
    pub version: u32,
    pub items: Vec<SpecItem>,
}

impl MatcherSpec {
    /// Creates a current-version descriptor.
    pub fn new(items: Vec<SpecItem>) -> Self {
        Self {
            version: SPEC_VERSION,
            items,
        }
    }

    /// Checks the version tag.
    pub fn validate(&self) -> AutoEditResult<()> {
        if self.version != SPEC_VERSION {
            return Err(AutoEditError::UnsupportedSpecVersion(self.version));
        }
        Ok(())
    }
}
