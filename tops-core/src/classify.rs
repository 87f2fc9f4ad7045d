use std::sync::LazyLock;

use regex::bytes::Regex;

static ERRORS_TRUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""errors"\s*:\s*true"#).expect("static regex"));

/// Итог bulk-запроса по телу ответа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// В ответе нет `"errors": true`
    Uploaded,
    /// Хранилище сообщило о частичной ошибке
    UploadedWithErrors,
}

/// Ищет в теле ответа `"errors"`, `:` и `true` (пробелы вокруг `:` допустимы,
/// регистр важен). Отдельные элементы bulk-ответа не разбираются.
pub fn classify_response(body: &[u8]) -> BulkOutcome {
    if ERRORS_TRUE.is_match(body) {
        BulkOutcome::UploadedWithErrors
    } else {
        BulkOutcome::Uploaded
    }
}
