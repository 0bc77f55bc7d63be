//! Parameter interchange rows.
//!
//! Fitted parameters are exchanged as a two-line comma-separated table with
//! three columns per parameter: `NAME`, `NAME_error` and `NAME_error %`. A
//! parameter is considered free when its error cell holds a number; fixed
//! parameters and parameters whose uncertainty could not be estimated carry
//! `NaN` in the error cells.

use crate::error::{EisFitError, Result};
use crate::parameters::{FreeParameterList, ParameterSet};

/// One parameter's entry in an interchange table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTableEntry {
    /// Parameter name (lower-case)
    pub name: String,
    /// Parameter value
    pub value: f64,
    /// Standard error, if available
    pub error: Option<f64>,
    /// Percent error, if available
    pub error_percent: Option<f64>,
}

impl ParameterTableEntry {
    /// Entry for a parameter without an uncertainty estimate.
    pub fn fixed(name: &str, value: f64) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value,
            error: None,
            error_percent: None,
        }
    }
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.6e}", v),
        _ => "NaN".to_string(),
    }
}

fn parse_cell(cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("n/a") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|_| EisFitError::ParseError(format!("invalid numeric cell '{}'", cell)))
}

/// Format entries as a `(header, values)` pair of CSV lines.
///
/// # Examples
///
/// ```
/// use eisfit_rs::parameters::{format_parameter_table, ParameterTableEntry};
///
/// let entries = vec![ParameterTableEntry::fixed("rm", 2.0)];
/// let (header, values) = format_parameter_table(&entries);
/// assert_eq!(header, "RM,RM_error,RM_error %");
/// assert_eq!(values, "2.000000e0,NaN,NaN");
/// ```
pub fn format_parameter_table(entries: &[ParameterTableEntry]) -> (String, String) {
    let mut header = Vec::with_capacity(entries.len() * 3);
    let mut values = Vec::with_capacity(entries.len() * 3);

    for entry in entries {
        let upper = entry.name.to_ascii_uppercase();
        header.push(upper.clone());
        header.push(format!("{}_error", upper));
        header.push(format!("{}_error %", upper));

        values.push(format_cell(Some(entry.value)));
        values.push(format_cell(entry.error));
        values.push(format_cell(entry.error_percent));
    }

    (header.join(","), values.join(","))
}

/// Parse a `(header, values)` pair of CSV lines into a parameter set and the
/// free list.
///
/// # Returns
///
/// * The set and free list, or `ParseError` for a malformed table
///
/// # Examples
///
/// ```
/// use eisfit_rs::parameters::parse_parameter_table;
///
/// let (params, free) = parse_parameter_table(
///     "RCT,RCT_error,RCT_error %,RM,RM_error,RM_error %",
///     "1.0e1,2.0e-1,2.0e0,2.0e0,NaN,NaN",
/// )
/// .unwrap();
/// assert_eq!(params.get("rct").unwrap(), 10.0);
/// assert_eq!(free.names(), &["rct".to_string()]);
/// ```
pub fn parse_parameter_table(
    header: &str,
    values: &str,
) -> Result<(ParameterSet, FreeParameterList)> {
    let entries = parse_parameter_entries(header, values)?;
    entries_to_parameters(&entries)
}

/// Parse a `(header, values)` pair of CSV lines back into entries.
///
/// # Returns
///
/// * The entries, or `ParseError` if the column count is not a multiple of 3,
///   the two lines differ in length, or a cell is not numeric
pub fn parse_parameter_entries(header: &str, values: &str) -> Result<Vec<ParameterTableEntry>> {
    let names: Vec<&str> = header.split(',').map(str::trim).collect();
    let cells: Vec<&str> = values.split(',').collect();

    if names.len() % 3 != 0 {
        return Err(EisFitError::ParseError(format!(
            "expected three columns per parameter, got {} columns",
            names.len()
        )));
    }
    if names.len() != cells.len() {
        return Err(EisFitError::ParseError(format!(
            "header has {} columns but value row has {}",
            names.len(),
            cells.len()
        )));
    }

    let mut entries = Vec::with_capacity(names.len() / 3);
    for idx in 0..names.len() / 3 {
        let name = names[3 * idx];
        if name.is_empty() {
            return Err(EisFitError::ParseError(format!("empty name in column {}", 3 * idx)));
        }
        let value = parse_cell(cells[3 * idx])?.ok_or_else(|| {
            EisFitError::ParseError(format!("missing value for parameter '{}'", name))
        })?;

        entries.push(ParameterTableEntry {
            name: name.to_ascii_lowercase(),
            value,
            error: parse_cell(cells[3 * idx + 1])?,
            error_percent: parse_cell(cells[3 * idx + 2])?,
        });
    }

    Ok(entries)
}

/// Split parsed entries into a parameter set and the free list.
///
/// Entries with an error value are free; the rest are fixed.
pub fn entries_to_parameters(
    entries: &[ParameterTableEntry],
) -> Result<(ParameterSet, FreeParameterList)> {
    let params = entries
        .iter()
        .map(|e| (e.name.as_str(), e.value))
        .collect::<ParameterSet>();
    let free = FreeParameterList::new(
        entries
            .iter()
            .filter(|e| e.error.is_some())
            .map(|e| e.name.as_str()),
    )?;
    Ok((params, free))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_table_roundtrip() {
        let entries = vec![
            ParameterTableEntry {
                name: "rct".to_string(),
                value: 12.5,
                error: Some(0.25),
                error_percent: Some(2.0),
            },
            ParameterTableEntry::fixed("cpe_b_p", 0.5),
        ];

        let (header, values) = format_parameter_table(&entries);
        assert_eq!(
            header,
            "RCT,RCT_error,RCT_error %,CPE_B_P,CPE_B_P_error,CPE_B_P_error %"
        );

        let parsed = parse_parameter_entries(&header, &values).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "rct");
        assert_relative_eq!(parsed[0].value, 12.5);
        assert_relative_eq!(parsed[0].error.unwrap(), 0.25);
        assert!(parsed[1].error.is_none());

        let (params, free) = entries_to_parameters(&parsed).unwrap();
        assert_eq!(params.get("cpe_b_p").unwrap(), 0.5);
        assert_eq!(free.names(), &["rct".to_string()]);
    }

    #[test]
    fn test_parse_accepts_python_style_exponents_and_nan() {
        let parsed =
            parse_parameter_entries("R,R_error,R_error %", "1.000000e+02,nan,N/A").unwrap();
        assert_relative_eq!(parsed[0].value, 100.0);
        assert!(parsed[0].error.is_none());
        assert!(parsed[0].error_percent.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_tables() {
        assert!(matches!(
            parse_parameter_table("R,R_error", "1,2"),
            Err(EisFitError::ParseError(_))
        ));
        assert!(matches!(
            parse_parameter_table("R,R_error,R_error %", "1,2"),
            Err(EisFitError::ParseError(_))
        ));
        assert!(matches!(
            parse_parameter_table("R,R_error,R_error %", "abc,,"),
            Err(EisFitError::ParseError(_))
        ));
    }
}
