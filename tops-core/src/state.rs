use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::bulk::OpenUnit;
use crate::error::CoreError;
use crate::types::{EnrichedRecord, LastTrade, QuoteUpdate, TradeReport};

/// Состояние одного отслеживаемого символа.
///
/// Трейд-часть и счётчики ротации живут в пределах одного входного файла,
/// `total_messages` - весь запуск.
#[derive(Debug, Default)]
pub struct SymbolState {
    /// Последняя сделка
    pub last_trade: Option<LastTrade>,
    /// Сделка ещё не попала ни в одну запись
    pub last_trade_changed: bool,
    /// Пар в текущем bulk-файле
    pub messages_in_unit: usize,
    /// Номер текущего bulk-файла
    pub unit_seq: u32,
    /// Всего пар за запуск
    pub total_messages: u64,
    pub(crate) open_unit: Option<OpenUnit>,
}

impl SymbolState {
    /// Запомнить сделку
    pub fn record_trade(&mut self, trade: &TradeReport) {
        self.last_trade = Some(LastTrade::from(trade));
        self.last_trade_changed = true;
    }

    /// Котировка + последняя сделка. Флаг смены сделки уходит
    /// только в первую запись после неё.
    pub fn enrich(&mut self, quote: &QuoteUpdate) -> EnrichedRecord {
        let mut rec = EnrichedRecord::from_quote(quote);
        if let Some(trade) = self.last_trade {
            rec.last_sale_price = trade.price;
            rec.last_sale_size = trade.size;
            rec.last_sale_timestamp = Some(trade.timestamp);
            rec.last_sale_changed = std::mem::take(&mut self.last_trade_changed);
        }
        rec
    }

    pub fn has_open_unit(&self) -> bool {
        self.open_unit.is_some()
    }

    /// Закрыть текущий bulk-файл (flush + close), вернуть его путь
    pub fn close_unit(&mut self) -> Result<Option<PathBuf>, CoreError> {
        match self.open_unit.take() {
            Some(unit) => unit.close().map(Some),
            None => Ok(None),
        }
    }

    /// Сброс перед новым входным файлом
    fn reset_for_input(&mut self) -> Result<(), CoreError> {
        let closed = self.close_unit();
        self.last_trade = None;
        self.last_trade_changed = false;
        self.messages_in_unit = 0;
        self.unit_seq = 0;
        closed.map(|_| ())
    }
}

/// Состояние всех символов за запуск.
///
/// Создаётся один раз и передаётся по `&mut` в обогащение и writer.
#[derive(Debug, Default)]
pub struct SymbolStore {
    states: BTreeMap<String, SymbolState>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolState> {
        self.states.get(symbol)
    }

    /// Состояние символа, создаётся при первом обращении
    pub fn entry(&mut self, symbol: &str) -> &mut SymbolState {
        self.states.entry(symbol.to_owned()).or_default()
    }

    /// Начало нового входного файла: все открытые файлы закрываются,
    /// история сделок и счётчики ротации обнуляются.
    ///
    /// Сбрасываются все символы, даже если закрытие одного из файлов
    /// упало; возвращается первая ошибка.
    pub fn begin_input(&mut self) -> Result<(), CoreError> {
        let mut first_err = None;
        for state in self.states.values_mut() {
            if let Err(e) = state.reset_for_input() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Закрыть все открытые bulk-файлы, вернуть их пути
    pub fn close_all(&mut self) -> Result<Vec<PathBuf>, CoreError> {
        let mut closed = Vec::new();
        let mut first_err = None;
        for state in self.states.values_mut() {
            match state.close_unit() {
                Ok(Some(path)) => closed.push(path),
                Ok(None) => {}
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(closed), Err)
    }

    /// (символ, всего пар) в алфавитном порядке
    pub fn totals(&self) -> impl Iterator<Item = (&str, u64)> {
        self.states
            .iter()
            .map(|(sym, st)| (sym.as_str(), st.total_messages))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
