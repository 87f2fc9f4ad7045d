use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use tops_core::constants::PROGRESS_EVERY;
use tops_core::WriterConfig;

use crate::config;

/// TOPS convert - capture-файлы событий -> bulk NDJSON для загрузки в индекс.
#[derive(Parser, Debug, Clone)]
#[command(name = "tops-convert", version, about)]
pub(crate) struct Args {
    /// Дублировать лог в файл (дописывается)
    #[arg(long, global = true)]
    pub(crate) log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Котировки + последняя сделка -> bulk-файлы по символам
    Merge(MergeArgs),
    /// Сырые события (котировки, сделки, официальные цены) построчно в JSON
    Raw(RawArgs),
    /// Сгенерировать синтетический capture-файл
    Synth(SynthArgs),
}

#[derive(ClapArgs, Debug, Clone)]
#[command(
    group(
        ArgGroup::new("symbols_source")
            .required(false)
            .multiple(false)
            .args(["symbols_file", "symbols"])
    )
)]
pub(crate) struct MergeArgs {
    /// Файл символов (по одному на строку, поддержка # комментариев)
    #[arg(long, conflicts_with = "symbols")]
    pub(crate) symbols_file: Option<PathBuf>,

    /// Символы строкой: "AAPL,AMD,SPY". Без обоих флагов - встроенный список
    #[arg(long, conflicts_with = "symbols_file")]
    pub(crate) symbols: Option<String>,

    /// Брать только файлы, в имени которых есть эта подстрока
    #[arg(long)]
    pub(crate) filter: Option<String>,

    /// Префикс `_index` в action-дескрипторах: <prefix>_<symbol>_<YYYYMM>
    #[arg(long)]
    pub(crate) action_index: Option<String>,

    /// Пар action/record на один bulk-файл
    #[arg(long, default_value_t = WriterConfig::default().rotation_threshold)]
    pub(crate) rotate_at: NonZeroUsize,

    /// Progress в лог каждые N записей символа (0 - выключено)
    #[arg(long, default_value_t = PROGRESS_EVERY)]
    pub(crate) progress_every: u64,

    /// Capture-файл или каталог с ними
    pub(crate) source: PathBuf,

    /// Каталог для bulk-файлов (по умолчанию текущий)
    pub(crate) dest: Option<PathBuf>,
}

impl MergeArgs {
    pub(crate) fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            rotation_threshold: self.rotate_at,
            progress_every: self.progress_every,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub(crate) struct RawArgs {
    /// Только события этого символа
    #[arg(long)]
    pub(crate) symbol: Option<String>,

    /// Брать только файлы, в имени которых есть эта подстрока
    #[arg(long)]
    pub(crate) filter: Option<String>,

    /// Capture-файл или каталог с ними
    pub(crate) source: PathBuf,

    /// Каталог для JSON (по умолчанию текущий)
    pub(crate) dest: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub(crate) struct SynthArgs {
    /// Символы строкой: "AAPL,AMD"
    #[arg(long)]
    pub(crate) symbols: String,

    /// Торговый день, YYYYMMDD; попадает в имя файла
    #[arg(long, default_value = config::SYNTH_DATE, value_parser = parse_date)]
    pub(crate) date: NaiveDate,

    /// Сколько событий сгенерировать
    #[arg(long, default_value_t = config::SYNTH_EVENTS)]
    pub(crate) events: u64,

    /// Seed генератора (для воспроизводимых файлов)
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Каталог для capture-файла
    pub(crate) dest: PathBuf,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|e| format!("expected YYYYMMDD ({e})"))
}

/// Каталог назначения: пустой -> текущий
pub(crate) fn dest_or_cwd(dest: Option<&PathBuf>) -> PathBuf {
    dest.cloned().unwrap_or_else(|| PathBuf::from("."))
}
