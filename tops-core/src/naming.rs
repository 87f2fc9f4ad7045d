//! Имена файлов: входной capture -> bulk-файлы -> индекс при загрузке.
//!
//! Bulk-файл называется `<base>_<SYMBOL>_<seq>.ndjson`, где `base` - имя
//! входного файла без capture-расширения. При загрузке из этого имени
//! обратно достаются символ и год (из первой даты `YYYYMMDD` в `base`).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{BULK_PATH_SUFFIX, CAPTURE_EXTENSION, UNIT_EXTENSION};
use crate::error::NamingError;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{8}").expect("static regex"));

fn file_name(path: &Path) -> Result<&str, NamingError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| NamingError::NoFileName(path.to_path_buf()))
}

/// Базовое имя входного файла: всё до capture-расширения
/// (или до последней точки), `%2F` заменяется на `-`.
pub fn input_base_name(path: &Path) -> Result<String, NamingError> {
    let name = file_name(path)?;
    let stem = match name.find(CAPTURE_EXTENSION) {
        Some(i) => &name[..i],
        None => name.rsplit_once('.').map_or(name, |(stem, _)| stem),
    };
    if stem.is_empty() {
        return Err(NamingError::NoFileName(path.to_path_buf()));
    }
    Ok(stem.replace("%2F", "-"))
}

/// `<base>_<SYMBOL>_<seq>.ndjson`
pub fn unit_file_name(base: &str, symbol: &str, seq: u32) -> String {
    format!("{base}_{symbol}_{seq}{UNIT_EXTENSION}")
}

/// Имя файла сырого экспорта: `<base>_<SYMBOL>.json` или `<base>.json`
pub fn raw_file_name(base: &str, symbol: Option<&str>) -> String {
    match symbol {
        Some(sym) => format!("{base}_{sym}.json"),
        None => format!("{base}.json"),
    }
}

/// Путь sidecar-файла: суффикс дописывается к полному имени bulk-файла
pub fn sidecar_path(unit: &Path, suffix: &str) -> PathBuf {
    let mut os = unit.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Куда загружать bulk-файл
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// имя файла без `.ndjson` - для логов
    pub unit_name: String,
    /// символ в нижнем регистре
    pub symbol: String,
    /// 4 цифры года
    pub year: String,
}

impl UploadTarget {
    /// Разбор имени `<base>_<SYMBOL>_<seq>.ndjson`
    pub fn from_unit_path(path: &Path) -> Result<Self, NamingError> {
        let name = file_name(path)?;
        let bad = || NamingError::BadUnitName(name.to_string());

        let (without_seq, _seq) = name.rsplit_once('_').ok_or_else(bad)?;
        let (base, symbol) = without_seq.rsplit_once('_').ok_or_else(bad)?;
        if symbol.is_empty() {
            return Err(bad());
        }

        let date = DATE_RE
            .find(base)
            .ok_or_else(|| NamingError::MissingDate(name.to_string()))?;

        let unit_name = name.strip_suffix(UNIT_EXTENSION).unwrap_or(name);

        Ok(Self {
            unit_name: unit_name.to_string(),
            symbol: symbol.to_ascii_lowercase(),
            year: date.as_str()[..4].to_string(),
        })
    }

    /// `<prefix>-<symbol>-<year>`
    pub fn index_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}-{}", self.symbol, self.year)
    }

    /// `<endpoint>/<prefix>-<symbol>-<year>/_bulk`
    pub fn bulk_url(&self, endpoint: &str, prefix: &str) -> String {
        let sep = if endpoint.ends_with('/') { "" } else { "/" };
        format!("{endpoint}{sep}{}{BULK_PATH_SUFFIX}", self.index_name(prefix))
    }
}
