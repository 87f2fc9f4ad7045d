use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::MergeArgs;
use crate::config;

#[derive(Debug, Error)]
pub(crate) enum SymbolsError {
    #[error("symbols list is empty (file: {path:?})")]
    EmptyFromFile { path: PathBuf },

    #[error("symbols list is empty (--symbols value: {raw:?})")]
    EmptyFromArg { raw: String },

    #[error("failed to read symbols file: {path:?}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read built-in symbols list")]
    Default(#[source] std::io::Error),
}

pub(crate) type Result<T> = std::result::Result<T, SymbolsError>;

/// Символы для merge:
/// - `--symbols-file` -> файл
/// - `--symbols`      -> CSV строка
/// - иначе            -> встроенный список
pub(crate) fn load_symbols(args: &MergeArgs) -> Result<Vec<String>> {
    if let Some(path) = &args.symbols_file {
        load_from_file(path)
    } else if let Some(raw) = &args.symbols {
        load_from_arg(raw)
    } else {
        config::load_default_symbols().map_err(SymbolsError::Default)
    }
}

fn load_from_file(path: &Path) -> Result<Vec<String>> {
    let symbols = config::load_symbols_file(path).map_err(|source| SymbolsError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    if symbols.is_empty() {
        return Err(SymbolsError::EmptyFromFile {
            path: path.to_path_buf(),
        });
    }
    Ok(symbols)
}

pub(crate) fn load_from_arg(raw: &str) -> Result<Vec<String>> {
    let symbols = tops_core::symbols::parse_symbols_csv(raw);
    if symbols.is_empty() {
        return Err(SymbolsError::EmptyFromArg {
            raw: raw.to_string(),
        });
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command};
    use clap::Parser;

    fn merge_args(extra: &[&str]) -> MergeArgs {
        let mut argv = vec!["tops-convert", "merge"];
        argv.extend_from_slice(extra);
        argv.push("in.evcap");
        match Args::try_parse_from(argv).unwrap().command {
            Command::Merge(m) => m,
            _ => panic!("expected merge"),
        }
    }

    #[test]
    fn csv_argument_wins_over_default() {
        let got = load_symbols(&merge_args(&["--symbols", "spy, aapl"])).unwrap();
        assert_eq!(got, vec!["AAPL", "SPY"]);
    }

    #[test]
    fn empty_csv_is_error() {
        let err = load_symbols(&merge_args(&["--symbols", " , "])).unwrap_err();
        assert!(matches!(err, SymbolsError::EmptyFromArg { .. }));
    }

    #[test]
    fn file_source_and_its_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "mu\n# x\nwmt\n").unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "# nothing\n").unwrap();
        let missing = dir.path().join("missing.txt");

        let got = load_symbols(&merge_args(&["--symbols-file", good.to_str().unwrap()])).unwrap();
        assert_eq!(got, vec!["MU", "WMT"]);

        let err = load_symbols(&merge_args(&["--symbols-file", empty.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, SymbolsError::EmptyFromFile { .. }));

        let err =
            load_symbols(&merge_args(&["--symbols-file", missing.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, SymbolsError::ReadFile { .. }));
    }

    #[test]
    fn no_source_falls_back_to_builtin_list() {
        let got = load_symbols(&merge_args(&[])).unwrap();
        assert_eq!(got.len(), 30);
    }
}
