use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config;

/// TOPS upload - bulk-файлы в поисковый индекс, итог рядом в sidecar-файле.
#[derive(Parser, Debug, Clone)]
#[command(name = "tops-upload", version, about)]
pub(crate) struct Args {
    /// Адрес хранилища, например https://search.example.com:9200
    #[arg(long)]
    pub(crate) url: String,

    /// Пользователь basic auth
    #[arg(long, env = config::USER_ENV)]
    pub(crate) user: String,

    /// Пароль basic auth
    #[arg(long, env = config::PASS_ENV, hide_env_values = true)]
    pub(crate) pass: String,

    /// Префикс индекса: <prefix>-<symbol>-<year>
    #[arg(long)]
    pub(crate) index: String,

    /// Сколько файлов загружать параллельно
    #[arg(long, default_value_t = config::DEFAULT_JOBS)]
    pub(crate) jobs: NonZeroUsize,

    /// Таймаут запроса, секунды (по умолчанию без таймаута)
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,

    /// Пропускать файлы, у которых уже есть `.response.json`
    #[arg(long)]
    pub(crate) skip_uploaded: bool,

    /// Bulk-файл или каталог с ними
    pub(crate) source: PathBuf,
}

impl Args {
    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
