//! Ordered list of parameters selected for optimization.
//!
//! The position of a name in the list is the index of its value in the flat
//! vector handed to an optimizer, so the list is the single place where the
//! named and positional views of the parameters meet.

use crate::error::{EisFitError, Result};
use crate::parameters::parameters::{normalize_name, ParameterSet};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Names of the free parameters, in optimizer order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FreeParameterList {
    names: Vec<String>,
}

impl FreeParameterList {
    /// Create a free-parameter list.
    ///
    /// Names are normalized the same way as `ParameterSet` keys.
    ///
    /// # Returns
    ///
    /// The list, or `EisFitError::DuplicateParameter` if a name repeats.
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::parameters::FreeParameterList;
    ///
    /// let free = FreeParameterList::new(["R", "c"]).unwrap();
    /// assert_eq!(free.names(), &["r".to_string(), "c".to_string()]);
    /// assert!(FreeParameterList::new(["r", "R"]).is_err());
    /// ```
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for name in names {
            let key = normalize_name(name.as_ref());
            if !seen.insert(key.clone()) {
                return Err(EisFitError::DuplicateParameter(key));
            }
            list.push(key);
        }
        Ok(Self { names: list })
    }

    /// The names, in optimizer order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    /// Position of a name in the list.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let key = normalize_name(name);
        self.names.iter().position(|n| *n == key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Check that every free name exists in `params`.
    pub fn validate_against(&self, params: &ParameterSet) -> Result<()> {
        params.require(self.names.iter())
    }

    /// Read the free values out of a parameter set, in list order.
    pub fn values_from(&self, params: &ParameterSet) -> Result<Array1<f64>> {
        self.names
            .iter()
            .map(|name| params.get(name))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Copy `params` and overwrite the free entries with `candidate`.
    ///
    /// When `scale` is given each candidate value is multiplied by the matching
    /// scale entry before it is written, which is how normalized-space
    /// candidates are mapped back to physical units.
    ///
    /// # Arguments
    ///
    /// * `params` - The full parameter set (left untouched)
    /// * `candidate` - One value per free parameter
    /// * `scale` - Optional per-parameter multipliers
    ///
    /// # Returns
    ///
    /// * The updated copy, or `DimensionMismatch` if the lengths disagree
    pub fn inject(
        &self,
        params: &ParameterSet,
        candidate: &Array1<f64>,
        scale: Option<&Array1<f64>>,
    ) -> Result<ParameterSet> {
        if candidate.len() != self.names.len() {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected {} free values, got {}",
                self.names.len(),
                candidate.len()
            )));
        }
        if let Some(scale) = scale {
            if scale.len() != self.names.len() {
                return Err(EisFitError::DimensionMismatch(format!(
                    "Expected {} scale factors, got {}",
                    self.names.len(),
                    scale.len()
                )));
            }
        }

        let mut local = params.clone();
        for (i, name) in self.names.iter().enumerate() {
            let value = match scale {
                Some(scale) => candidate[i] * scale[i],
                None => candidate[i],
            };
            local.insert(name, value);
        }
        Ok(local)
    }
}

impl TryFrom<Vec<String>> for FreeParameterList {
    type Error = EisFitError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<FreeParameterList> for Vec<String> {
    fn from(list: FreeParameterList) -> Self {
        list.names
    }
}
