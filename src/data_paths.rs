//! Purpose: Dataset path and field-separator resolution for the CLI.
//! Exports: `DATA_ENV`, `resolve_data_path`, `parse_delimiter`.
//! Role: Keep CLI defaults in one place so help text and behavior agree.
//! Invariants: An explicit `--data` (or `ZIPNEAR_DATA`) always wins over the default file name.
//! Invariants: Delimiters are a single character; `tab` and `\t` name the tab character.

use std::path::PathBuf;

pub(crate) const DATA_ENV: &str = "ZIPNEAR_DATA";
pub(crate) const DEFAULT_DATA_FILE: &str = "uscities.csv";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum DelimiterError {
    Empty,
    MultipleCharacters,
}

pub(crate) fn resolve_data_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}

pub(crate) fn parse_delimiter(value: &str) -> Result<char, DelimiterError> {
    if value == "tab" || value == "\\t" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(DelimiterError::Empty),
        (Some(c), None) => Ok(c),
        (Some(_), Some(_)) => Err(DelimiterError::MultipleCharacters),
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_DATA_FILE, DelimiterError, parse_delimiter, resolve_data_path};
    use std::path::PathBuf;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_data_path(Some(PathBuf::from("/tmp/cities.csv")));
        assert_eq!(path, PathBuf::from("/tmp/cities.csv"));
    }

    #[test]
    fn missing_or_empty_path_falls_back_to_default() {
        assert_eq!(resolve_data_path(None), PathBuf::from(DEFAULT_DATA_FILE));
        assert_eq!(
            resolve_data_path(Some(PathBuf::new())),
            PathBuf::from(DEFAULT_DATA_FILE)
        );
    }

    #[test]
    fn delimiter_parsing() {
        assert_eq!(parse_delimiter(","), Ok(','));
        assert_eq!(parse_delimiter("|"), Ok('|'));
        assert_eq!(parse_delimiter("tab"), Ok('\t'));
        assert_eq!(parse_delimiter("\\t"), Ok('\t'));
        assert_eq!(parse_delimiter(""), Err(DelimiterError::Empty));
        assert_eq!(parse_delimiter(";;"), Err(DelimiterError::MultipleCharacters));
    }
}
