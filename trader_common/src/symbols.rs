//! Instrument symbol lists.

use std::collections::HashSet;
use std::io::BufRead;

use crate::error::TraderError;
use crate::result::Result;

/// Validate and uppercase one instrument symbol.
///
/// Accepts ASCII alphanumerics, `.` and `-` after trimming surrounding whitespace.
pub fn normalize_symbol(token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TraderError::InvalidArgument("empty symbol".to_string()));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(TraderError::InvalidArgument(format!(
            "invalid symbol {:?}",
            token
        )));
    }
    Ok(token.to_ascii_uppercase())
}

/// Read symbols separated by commas, whitespace or new lines.
///
/// Symbols are normalized with [`normalize_symbol`] and de-duplicated keeping the
/// first occurrence order. Everything after a `#` on a line is a comment. An invalid
/// token fails with [`TraderError::ParseSymbolsFile`] naming its line.
pub fn read_symbols<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(TraderError::Io)?;
        let content = line.split('#').next().unwrap_or_default();

        for token in content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let symbol = normalize_symbol(token).map_err(|e| {
                TraderError::ParseSymbolsFile(format!("line {}: {}", line_no + 1, e))
            })?;
            if seen.insert(symbol.clone()) {
                symbols.push(symbol);
            }
        }
    }
    Ok(symbols)
}
