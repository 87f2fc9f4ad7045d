use std::io;
use std::io::Cursor;
use std::path::Path;

const DEFAULT_SYMBOLS: &str = include_str!("../assets/symbols.txt");

/// Торговый день synth по умолчанию
pub(crate) const SYNTH_DATE: &str = "20180127";

/// Событий в synth-файле по умолчанию
pub(crate) const SYNTH_EVENTS: u64 = 10_000;

/// Начало торговой сессии в synth (UTC)
pub(crate) const SYNTH_SESSION_OPEN: (u32, u32) = (14, 30);

pub(crate) fn load_default_symbols() -> io::Result<Vec<String>> {
    tops_core::symbols::read_symbols(Cursor::new(DEFAULT_SYMBOLS))
}

pub(crate) fn load_symbols_file(path: &Path) -> io::Result<Vec<String>> {
    tops_core::symbols::read_symbols_from_path(path)
}
