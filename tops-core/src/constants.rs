/// Сколько пар action/record помещается в один bulk-файл
pub const ROTATION_THRESHOLD: usize = 20_000;

/// Интервал progress-уведомлений (по общему числу сообщений символа)
pub const PROGRESS_EVERY: u64 = 5_000;

/// Расширение capture-файлов
pub const CAPTURE_EXTENSION: &str = ".evcap";

/// Расширение bulk-файлов
pub const UNIT_EXTENSION: &str = ".ndjson";

/// `_type` в action-дескрипторе
pub const DOC_TYPE: &str = "_doc";

/// Media type тела bulk-запроса
pub const BULK_CONTENT_TYPE: &str = "application/x-ndjson";

/// Суффикс bulk-эндпоинта
pub const BULK_PATH_SUFFIX: &str = "/_bulk";

/// Маркер успешной загрузки, пишется в `<unit>.response.json`
pub const SUCCESS_MARKER: &str = r#"{"result":"uploaded successfully"}"#;

/// Sidecar успешной загрузки
pub const RESPONSE_SIDECAR_SUFFIX: &str = ".response.json";
/// Sidecar с сырым телом ответа при ошибке
pub const ERROR_SIDECAR_SUFFIX: &str = ".error.json";
