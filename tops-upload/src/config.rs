use std::num::NonZeroUsize;

/// Параллельных загрузок по умолчанию (последовательно)
pub(crate) const DEFAULT_JOBS: NonZeroUsize = NonZeroUsize::MIN;

/// Переменные окружения для учётных данных
pub(crate) const USER_ENV: &str = "TOPS_UPLOAD_USER";
pub(crate) const PASS_ENV: &str = "TOPS_UPLOAD_PASS";

/// Расширение, по которому в каталоге выбираются bulk-файлы
pub(crate) const UNIT_SUFFIX: &str = "ndjson";
