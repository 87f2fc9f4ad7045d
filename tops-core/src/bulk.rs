//! Bulk writer: пары action/record в NDJSON с ротацией файлов.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::constants::{PROGRESS_EVERY, ROTATION_THRESHOLD};
use crate::error::CoreError;
use crate::naming::unit_file_name;
use crate::state::SymbolState;
use crate::types::{ActionDescriptor, EnrichedRecord};

/// Куда отправлять progress-уведомления.
///
/// Вызывается синхронно из writer, поэтому реализация не должна блокироваться.
pub trait ProgressSink {
    /// `total` пар записано по символу за запуск
    fn progress(&mut self, symbol: &str, total: u64);
}

/// Progress в лог
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&mut self, symbol: &str, total: u64) {
        info!("{symbol} {total}");
    }
}

/// Параметры writer
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    /// После скольких пар файл ротируется
    pub rotation_threshold: NonZeroUsize,
    /// Интервал progress-уведомлений, 0 - выключено
    pub progress_every: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            rotation_threshold: NonZeroUsize::new(ROTATION_THRESHOLD).unwrap_or(NonZeroUsize::MIN),
            progress_every: PROGRESS_EVERY,
        }
    }
}

/// Открытый bulk-файл символа
#[derive(Debug)]
pub struct OpenUnit {
    path: PathBuf,
    out: BufWriter<File>,
    /// (год, месяц) первой записи
    month: (i32, u32),
}

impl OpenUnit {
    fn create(path: PathBuf, month: (i32, u32)) -> Result<Self, CoreError> {
        match File::create(&path) {
            Ok(file) => Ok(Self {
                out: BufWriter::with_capacity(1 << 16, file),
                path,
                month,
            }),
            Err(source) => Err(CoreError::CreateUnit { path, source }),
        }
    }

    /// Документ + `\n`. Сериализация в буфер, так что ошибки ввода-вывода
    /// всегда приходят как `WriteUnit` с путём файла.
    fn write_doc<T: Serialize>(&mut self, doc: &T) -> Result<(), CoreError> {
        let mut line = serde_json::to_vec(doc)?;
        line.push(b'\n');
        self.out.write_all(&line).map_err(|source| CoreError::WriteUnit {
            path: self.path.clone(),
            source,
        })
    }

    fn write_pair(&mut self, action: &ActionDescriptor, record: &EnrichedRecord) -> Result<(), CoreError> {
        self.write_doc(action)?;
        self.write_doc(record)
    }

    /// flush + close
    pub(crate) fn close(self) -> Result<PathBuf, CoreError> {
        let Self { path, out, .. } = self;
        match out.into_inner() {
            Ok(_file) => Ok(path),
            Err(e) => Err(CoreError::WriteUnit {
                path,
                source: e.into_error(),
            }),
        }
    }
}

/// Пишет пары action/record в файлы `<dest>/<base>_<SYMBOL>_<seq>.ndjson`.
///
/// Один writer на запуск; `begin_input` переключает базовое имя
/// на очередной входной файл.
pub struct BulkWriter<P: ProgressSink = LogProgress> {
    dest_dir: PathBuf,
    base_name: String,
    cfg: WriterConfig,
    progress: P,
    units_opened: u64,
}

impl BulkWriter<LogProgress> {
    pub fn new(dest_dir: impl Into<PathBuf>, cfg: WriterConfig) -> Self {
        Self::with_progress(dest_dir, cfg, LogProgress)
    }
}

impl<P: ProgressSink> BulkWriter<P> {
    pub fn with_progress(dest_dir: impl Into<PathBuf>, cfg: WriterConfig, progress: P) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            base_name: String::new(),
            cfg,
            progress,
            units_opened: 0,
        }
    }

    /// Базовое имя файлов для следующего входного файла
    pub fn begin_input(&mut self, base_name: impl Into<String>) {
        self.base_name = base_name.into();
    }

    /// Сколько bulk-файлов открыто за запуск
    pub fn units_opened(&self) -> u64 {
        self.units_opened
    }

    pub fn progress_sink(&self) -> &P {
        &self.progress
    }

    /// Дописать пару в текущий файл символа.
    ///
    /// Файл открывается лениво. Если месяц записи отличается от месяца
    /// первой записи файла, файл сначала ротируется. После достижения
    /// порога файл закрывается, следующая запись откроет `seq + 1`.
    pub fn emit(
        &mut self,
        state: &mut SymbolState,
        action: &ActionDescriptor,
        record: &EnrichedRecord,
    ) -> Result<(), CoreError> {
        let month = record.year_month();

        if state.open_unit.as_ref().is_some_and(|u| u.month != month) {
            info!("{} month changed, rotating", record.symbol);
            self.rotate(state)?;
        }

        let unit = match state.open_unit.take() {
            Some(unit) => unit,
            None => self.open_unit(&record.symbol, state.unit_seq, month)?,
        };
        let unit = state.open_unit.insert(unit);
        unit.write_pair(action, record)?;

        state.total_messages += 1;
        state.messages_in_unit += 1;

        if self.cfg.progress_every > 0 && state.total_messages % self.cfg.progress_every == 0 {
            self.progress.progress(&record.symbol, state.total_messages);
        }

        if state.messages_in_unit >= self.cfg.rotation_threshold.get() {
            info!("{} reaching bulk size", record.symbol);
            self.rotate(state)?;
        }

        Ok(())
    }

    fn open_unit(&mut self, symbol: &str, seq: u32, month: (i32, u32)) -> Result<OpenUnit, CoreError> {
        let path = self
            .dest_dir
            .join(unit_file_name(&self.base_name, symbol, seq));
        info!("writing {}", path.display());
        let unit = OpenUnit::create(path, month)?;
        self.units_opened += 1;
        Ok(unit)
    }

    fn rotate(&mut self, state: &mut SymbolState) -> Result<(), CoreError> {
        let closed = state.close_unit();
        state.unit_seq += 1;
        state.messages_in_unit = 0;
        closed.map(|_| ())
    }
}
