//! # tops-core
//!
//! Ядро конвейера: события рынка -> обогащённые котировки -> bulk NDJSON.
//!
//! Этот крейт содержит:
//!
//! - [`types`] — события декодера, обогащённая запись, action-дескриптор
//! - [`symbols`] — чтение и нормализация списка символов, фильтр
//! - [`source`] — граница декодера ([`EventSource`])
//! - [`wire`] — capture-формат событий (версия + кадры postcard с CRC)
//! - [`state`] — состояние символов за запуск
//! - [`enrich`] — слияние сделок и котировок
//! - [`bulk`] — запись NDJSON с ротацией файлов
//! - [`naming`] — имена bulk-файлов и индексов
//! - [`classify`] — разбор ответа bulk API
//! - [`error`] — типы ошибок
//!
//! ## Пример: сделка, затем котировка
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tops_core::{Enricher, Event, QuoteUpdate, SymbolFilter, SymbolStore, TradeReport};
//!
//! let t0 = Utc.with_ymd_and_hms(2018, 1, 27, 14, 30, 0).unwrap();
//! let filter = SymbolFilter::new(["AAPL"]);
//! let mut store = SymbolStore::new();
//! let enricher = Enricher::new(&filter);
//!
//! let trade = Event::Trade(TradeReport {
//!     symbol: "AAPL".into(),
//!     timestamp: t0,
//!     price: 100.0,
//!     size: 10,
//! });
//! assert!(enricher.apply(&trade, &mut store).is_none());
//!
//! let quote = Event::Quote(QuoteUpdate {
//!     symbol: "AAPL".into(),
//!     timestamp: t0,
//!     bid_size: 50,
//!     bid_price: 99.9,
//!     ask_price: 100.1,
//!     ask_size: 40,
//! });
//! let rec = enricher.apply(&quote, &mut store).unwrap();
//! assert_eq!(rec.last_sale_price, 100.0);
//! assert!(rec.last_sale_changed);
//! ```
//!
//! ## Пример: классификация ответа
//!
//! ```rust
//! use tops_core::classify::{classify_response, BulkOutcome};
//!
//! let body = br#"{"took":1,"errors" : true,"items":[]}"#;
//! assert_eq!(classify_response(body), BulkOutcome::UploadedWithErrors);
//! ```
//!
//! ## Дизайн
//!
//! Всё синхронное и однопоточное: один входной файл обрабатывается целиком,
//! прежде чем начнётся следующий. Состояние символов не глобальное -
//! [`SymbolStore`] создаётся один раз и передаётся по `&mut`.
//! HTTP здесь нет: загрузка живёт в `tops-upload`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Запись bulk NDJSON с ротацией.
pub mod bulk;

/// Классификация ответа bulk API.
pub mod classify;

/// Общие константы.
pub mod constants;

/// Обогащение котировок последней сделкой.
pub mod enrich;

/// Ошибки `tops-core`.
pub mod error;

/// Имена файлов и индексов.
pub mod naming;

/// Граница декодера событий.
pub mod source;

/// Состояние символов.
pub mod state;

/// Чтение/нормализация списка символов.
pub mod symbols;

/// Доменные типы.
pub mod types;

/// Capture-формат событий.
pub mod wire;

// --- Re-exports (публичный фасад API) ---

pub use crate::bulk::{BulkWriter, LogProgress, ProgressSink, WriterConfig};
pub use crate::classify::{BulkOutcome, classify_response};
pub use crate::enrich::{Aborted, EnrichStats, Enricher};
pub use crate::error::{CoreError, NamingError, WireError};
pub use crate::source::{EventSource, MemorySource};
pub use crate::state::{SymbolState, SymbolStore};
pub use crate::symbols::SymbolFilter;
pub use crate::types::{
    ActionDescriptor, EnrichedRecord, Event, LastTrade, OfficialPrice, QuoteUpdate, Timestamp,
    TradeReport,
};
pub use crate::wire::{CaptureReader, CaptureWriter};
