use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::constants::DOC_TYPE;

/// Момент времени события (UTC, наносекундная точность).
pub type Timestamp = DateTime<Utc>;

/// Обновление лучших цен (top of book).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub symbol: String,
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub timestamp: Timestamp,
    pub bid_size: u32,
    pub bid_price: f64,
    pub ask_price: f64,
    pub ask_size: u32,
}

/// Отчёт о сделке.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReport {
    pub symbol: String,
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub timestamp: Timestamp,
    pub price: f64,
    pub size: u32,
}

/// Официальная цена открытия/закрытия. Обогащение её игнорирует.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficialPrice {
    pub symbol: String,
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub timestamp: Timestamp,
    /// `b'Q'` - открытие, `b'M'` - закрытие
    pub price_type: u8,
    pub price: f64,
}

/// Декодированное событие рынка.
///
/// Набор вариантов закрыт: новый вид сообщения требует правки всех `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Quote(QuoteUpdate),
    Trade(TradeReport),
    OfficialPrice(OfficialPrice),
    /// Любое другое сообщение декодера (тип сообщения как есть)
    Other { kind: u8 },
}

impl Event {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Event::Quote(q) => Some(&q.symbol),
            Event::Trade(t) => Some(&t.symbol),
            Event::OfficialPrice(p) => Some(&p.symbol),
            Event::Other { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Event::Quote(q) => Some(q.timestamp),
            Event::Trade(t) => Some(t.timestamp),
            Event::OfficialPrice(p) => Some(p.timestamp),
            Event::Other { .. } => None,
        }
    }
}

/// Последняя сделка по символу.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastTrade {
    pub price: f64,
    pub size: u32,
    pub timestamp: Timestamp,
}

impl From<&TradeReport> for LastTrade {
    fn from(t: &TradeReport) -> Self {
        Self {
            price: t.price,
            size: t.size,
            timestamp: t.timestamp,
        }
    }
}

/// Котировка, дополненная последней сделкой по тому же символу.
///
/// Ключи JSON короткие - это стабильный контракт bulk-файла.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(rename = "t", serialize_with = "ser_ts")]
    pub timestamp: Timestamp,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "lss")]
    pub last_sale_size: u32,
    #[serde(rename = "lsp")]
    pub last_sale_price: f64,
    /// `null`, пока по символу не было ни одной сделки
    #[serde(rename = "lst", serialize_with = "ser_ts_opt")]
    pub last_sale_timestamp: Option<Timestamp>,
    /// первая котировка после новой сделки; в JSON только `true`
    #[serde(rename = "ls", default, skip_serializing_if = "is_false")]
    pub last_sale_changed: bool,
    #[serde(rename = "bs")]
    pub bid_size: u32,
    #[serde(rename = "bp")]
    pub bid_price: f64,
    #[serde(rename = "ap")]
    pub ask_price: f64,
    #[serde(rename = "as")]
    pub ask_size: u32,
}

impl EnrichedRecord {
    /// Запись без данных о сделке.
    pub fn from_quote(q: &QuoteUpdate) -> Self {
        Self {
            timestamp: q.timestamp,
            symbol: q.symbol.clone(),
            last_sale_size: 0,
            last_sale_price: 0.0,
            last_sale_timestamp: None,
            last_sale_changed: false,
            bid_size: q.bid_size,
            bid_price: q.bid_price,
            ask_price: q.ask_price,
            ask_size: q.ask_size,
        }
    }

    /// (год, месяц) котировки - по нему выбирается индекс и ротация
    pub fn year_month(&self) -> (i32, u32) {
        (self.timestamp.year(), self.timestamp.month())
    }
}

/// Первая строка bulk-пары: `{"index":{"_type":"_doc"}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescriptor {
    pub index: IndexAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexAction {
    #[serde(rename = "_index", skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_type")]
    pub doc_type: &'static str,
}

impl ActionDescriptor {
    /// Дескриптор без имени индекса (индекс задаётся URL при загрузке).
    pub fn doc() -> Self {
        Self {
            index: IndexAction {
                index: None,
                doc_type: DOC_TYPE,
            },
        }
    }

    /// Дескриптор под запись. С префиксом имя индекса строится как
    /// `<prefix>_<symbol>_<YYYYMM>` по времени записи.
    pub fn for_record(record: &EnrichedRecord, index_prefix: Option<&str>) -> Self {
        let index = index_prefix.map(|prefix| {
            format!(
                "{prefix}_{}_{}",
                record.symbol.to_ascii_lowercase(),
                record.timestamp.format("%Y%m")
            )
        });
        Self {
            index: IndexAction {
                index,
                doc_type: DOC_TYPE,
            },
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn ser_ts<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}

fn ser_ts_opt<S: Serializer>(ts: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => ser_ts(ts, s),
        None => s.serialize_none(),
    }
}

/// RFC 3339 в UTC с `Z`, дробная часть секунд - только если есть.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
