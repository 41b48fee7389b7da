//! Loading of keyword lists and credential files.

use std::path::Path;

use crate::error::InputError;
use crate::types::Credential;

/// Parse a newline-delimited keyword list.
///
/// Surrounding whitespace is trimmed and blank lines are ignored. Query
/// operators inside a keyword (e.g. `NOT:vector`) are kept verbatim.
pub fn parse_keywords(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Read a keyword list from disk.
pub fn load_keywords(path: &Path) -> Result<Vec<String>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_keywords(&content))
}

/// Read a JSON array of credentials from disk.
///
/// Fails if the file holds no credentials, since the search stage would have
/// no workers.
pub fn load_credentials(path: &Path) -> Result<Vec<Credential>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let credentials: Vec<Credential> =
        serde_json::from_str(&content).map_err(|source| InputError::Credentials {
            path: path.to_path_buf(),
            source,
        })?;
    if credentials.is_empty() {
        return Err(InputError::NoCredentials(path.to_path_buf()));
    }
    Ok(credentials)
}
