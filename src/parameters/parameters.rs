//! Parameter set implementation
//!
//! This module provides the ParameterSet struct, a case-insensitive mapping from
//! parameter names to real values. A set holds every value a circuit model reads,
//! whether it is varied during a fit or held fixed.

use crate::error::{EisFitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a parameter name to its storage key.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// A collection of named parameter values.
///
/// Names are case-insensitive: `"Rct"`, `"RCT"` and `"rct"` address the same
/// entry. Keys are kept in sorted order so iteration and serialization are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, f64>,
}

impl ParameterSet {
    /// Create a new empty parameter set
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::parameters::ParameterSet;
    ///
    /// let params = ParameterSet::new();
    /// assert!(params.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parameter set from `(name, value)` pairs.
    ///
    /// Later pairs overwrite earlier ones with the same (case-insensitive) name.
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::parameters::ParameterSet;
    ///
    /// let params = ParameterSet::from_pairs([("R", 100.0), ("c", 1e-6)]);
    /// assert_eq!(params.get("r").unwrap(), 100.0);
    /// assert_eq!(params.get("C").unwrap(), 1e-6);
    /// ```
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert(name.as_ref(), value);
        }
        set
    }

    /// Insert or replace a value, returning the previous value if any.
    pub fn insert(&mut self, name: &str, value: f64) -> Option<f64> {
        self.values.insert(normalize_name(name), value)
    }

    /// Get the value of a parameter.
    ///
    /// # Returns
    ///
    /// The value, or `EisFitError::MissingParameter` when the name is not in
    /// the set.
    pub fn get(&self, name: &str) -> Result<f64> {
        self.values
            .get(&normalize_name(name))
            .copied()
            .ok_or_else(|| EisFitError::MissingParameter(name.to_string()))
    }

    /// Get the value of a parameter if present.
    pub fn try_get(&self, name: &str) -> Option<f64> {
        self.values.get(&normalize_name(name)).copied()
    }

    /// Check whether a parameter exists in the set
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&normalize_name(name))
    }

    /// Remove a parameter from the set, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(&normalize_name(name))
    }

    /// Number of parameters in the set
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of all parameters, in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Iterate over `(name, value)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    /// Check that every name in `names` is present.
    ///
    /// Stops at the first missing name and reports it.
    pub fn require<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.contains(name) {
                return Err(EisFitError::MissingParameter(name.to_string()));
            }
        }
        Ok(())
    }

    /// Save parameters to a JSON string
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::parameters::ParameterSet;
    ///
    /// let params = ParameterSet::from_pairs([("rm", 2.5)]);
    /// let json = params.to_json().unwrap();
    /// assert!(json.contains("\"rm\""));
    /// ```
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load parameters from a JSON object of `name: value` pairs.
    ///
    /// Keys are normalized on load, so `{"RCT": 10.0}` is addressable as `"rct"`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, f64> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(raw))
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
