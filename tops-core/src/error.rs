use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Верхнеуровневый тип ошибок крейта
#[derive(Debug, Error)]
pub enum CoreError {
    /// Ошибка декодирования входного потока событий
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Не удалось создать bulk-файл
    #[error("cannot create unit {path:?}: {source}")]
    CreateUnit {
        /// путь bulk-файла
        path: PathBuf,
        /// исходная ошибка
        #[source]
        source: io::Error,
    },

    /// Ошибка записи/закрытия bulk-файла
    #[error("cannot write unit {path:?}: {source}")]
    WriteUnit {
        /// путь bulk-файла
        path: PathBuf,
        /// исходная ошибка
        #[source]
        source: io::Error,
    },

    /// Ошибка сериализации записи в JSON
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),

}

/// Ошибки capture-формата (граница Event Source)
#[derive(Debug, Error)]
pub enum WireError {
    /// Файл не начинается с magic `EVCP`
    #[error("bad capture magic")]
    BadMagic,

    /// Неверная версия формата
    #[error("unsupported wire version: {0}")]
    UnsupportedWireVersion(u8),

    /// Кадр оборван посреди заголовка или payload
    #[error("truncated frame at offset {offset}")]
    Truncated {
        /// смещение начала кадра
        offset: u64,
    },

    /// Заявленная длина кадра больше допустимой
    #[error("frame too large: {len} bytes at offset {offset}")]
    FrameTooLarge {
        /// заявленная длина
        len: u32,
        /// смещение начала кадра
        offset: u64,
    },

    /// CRC payload не совпал
    #[error("crc mismatch at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// смещение начала кадра
        offset: u64,
        /// CRC из заголовка
        expected: u32,
        /// CRC прочитанных байт
        actual: u32,
    },

    /// Ошибка сериализации/десериализации
    #[error("postcard encode/decode error: {0}")]
    Postcard(#[from] postcard::Error),

    /// Ошибка чтения/записи
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ошибки разбора имён файлов
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    /// Нет имени файла (путь вида `/` или `..`)
    #[error("path has no file name: {0:?}")]
    NoFileName(PathBuf),

    /// Имя не похоже на `<base>_<SYMBOL>_<seq>.ndjson`
    #[error("unit name does not look like <base>_<SYMBOL>_<seq>: {0}")]
    BadUnitName(String),

    /// В имени нет даты `YYYYMMDD`
    #[error("unit name has no 8-digit date: {0}")]
    MissingDate(String),
}
