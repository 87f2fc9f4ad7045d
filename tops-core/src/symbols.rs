use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Набор отслеживаемых символов.
///
/// События по символам вне набора отбрасываются. Пустой фильтр
/// не пропускает ничего.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolFilter {
    symbols: BTreeSet<String>,
}

impl SymbolFilter {
    /// Фильтр из уже нормализованного списка.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Отслеживается ли символ (сравнение точное, с учётом регистра)
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

/// Чтение символов построчно, `#` - комментарий
pub fn read_symbols<R: io::Read>(reader: R) -> io::Result<Vec<String>> {
    let mut set = BTreeSet::new();

    for line in BufReader::new(reader).lines() {
        if let Some(sym) = normalize_line(&line?) {
            set.insert(sym);
        }
    }

    Ok(set.into_iter().collect())
}

/// Чтение символов из файла
pub fn read_symbols_from_path(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    read_symbols(File::open(path)?)
}

fn normalize_line(line: &str) -> Option<String> {
    // "AAPL # comment" -> "AAPL"
    let s = line.split('#').next().unwrap_or("").trim();
    if s.is_empty() {
        return None;
    }
    Some(s.to_ascii_uppercase())
}

/// Парсит список вида "AAPL, amd, ,SPY":
/// запятая как разделитель, пустые элементы пропускаются,
/// ASCII uppercase, результат отсортирован и без дублей.
pub fn parse_symbols_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_uppercase)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_symbols_csv_sorts_dedups_and_uppercases() {
        let got = parse_symbols_csv(" spy, AAPL, ,amd ,aapl,, SPY ");
        assert_eq!(got, vec!["AAPL", "AMD", "SPY"]);
    }

    #[test]
    fn parse_symbols_csv_empty_input() {
        assert!(parse_symbols_csv("").is_empty());
        assert!(parse_symbols_csv(" , ,").is_empty());
    }

    #[test]
    fn normalize_line_handles_comments() {
        assert_eq!(normalize_line("   "), None);
        assert_eq!(normalize_line("# full line"), None);
        assert_eq!(normalize_line("  #"), None);
        assert_eq!(normalize_line("nflx # streaming"), Some("NFLX".to_string()));
        assert_eq!(normalize_line("mu#"), Some("MU".to_string()));
    }

    #[test]
    fn read_symbols_skips_blank_and_comment_lines() {
        let input = "\
qqq
# indexes
  spy   # etf
QQQ

m
";
        let got = read_symbols(Cursor::new(input)).unwrap();
        assert_eq!(got, vec!["M", "QQQ", "SPY"]);
    }

    #[test]
    fn read_symbols_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.txt");
        std::fs::write(&path, "aapl\nwmt\n#x\nAAPL\n").unwrap();

        assert_eq!(read_symbols_from_path(&path).unwrap(), vec!["AAPL", "WMT"]);
    }

    #[test]
    fn filter_is_exact_match() {
        let f = SymbolFilter::new(parse_symbols_csv("AAPL,AMD"));
        assert!(f.contains("AAPL"));
        assert!(!f.contains("aapl"));
        assert!(!f.contains("AMZN"));
        assert_eq!(f.len(), 2);
        assert_eq!(f.iter().collect::<Vec<_>>(), vec!["AAPL", "AMD"]);

        assert!(SymbolFilter::default().is_empty());
    }
}
