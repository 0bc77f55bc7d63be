//! # Parameter System
//!
//! Named parameters for equivalent-circuit models.
//!
//! ## Core Components
//!
//! - [`ParameterSet`]: Case-insensitive mapping from names to values, holding
//!   every value a circuit reads
//! - [`FreeParameterList`]: The ordered subset of names an optimizer varies
//! - [`ParameterTableEntry`] with [`format_parameter_table`] and
//!   [`parse_parameter_table`]: The CSV-style interchange rows for fitted values
//!
//! ## Example Usage
//!
//! ```rust
//! use eisfit_rs::parameters::{FreeParameterList, ParameterSet};
//! use ndarray::array;
//!
//! let params = ParameterSet::from_pairs([("r", 100.0), ("c", 1e-6)]);
//! let free = FreeParameterList::new(["r"]).unwrap();
//!
//! // Convert to array for optimizer (only free parameters)
//! let x0 = free.values_from(&params).unwrap();
//! assert_eq!(x0, array![100.0]);
//!
//! // After optimization, write the candidate back into a copy
//! let updated = free.inject(&params, &array![120.0], None).unwrap();
//! assert_eq!(updated.get("r").unwrap(), 120.0);
//! assert_eq!(updated.get("c").unwrap(), 1e-6);
//! ```

pub mod free;
#[allow(clippy::module_inception)]
pub mod parameters;
pub mod table;

pub use free::FreeParameterList;
pub use parameters::ParameterSet;
pub use table::{
    entries_to_parameters, format_parameter_table, parse_parameter_entries, parse_parameter_table,
    ParameterTableEntry,
};
