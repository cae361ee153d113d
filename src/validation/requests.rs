use garde::{Report, Validate};

use crate::error::{AppError, Result};

/// Runs the garde rules of a request payload.
///
/// # Arguments
///
/// * `payload` - The deserialized request body.
///
/// # Returns
///
/// The payload itself, or `AppError::BadRequest` describing the first
/// failing fields.
pub fn validated<T>(payload: T) -> Result<T>
where
    T: Validate,
    T::Context: Default,
{
    payload
        .validate()
        .map_err(|report| AppError::BadRequest(describe(&report)))?;
    Ok(payload)
}

/// Joins the report entries, naming fields the way the JSON body does.
fn describe(report: &Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            let path = path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{}: {}", wire_name(&path), error)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// `forward_to` -> `forwardTo`. Request bodies are camelCase on the wire.
fn wire_name(path: &str) -> String {
    let mut name = String::with_capacity(path.len());
    let mut upper = false;
    for c in path.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}
