use log::debug;
use thiserror::Error;

use crate::bulk::{BulkWriter, ProgressSink};
use crate::error::CoreError;
use crate::source::EventSource;
use crate::state::SymbolStore;
use crate::symbols::SymbolFilter;
use crate::types::{ActionDescriptor, EnrichedRecord, Event};

/// Счётчики по одному входному файлу
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    /// Прочитано событий
    pub events: u64,
    /// Учтено сделок по отслеживаемым символам
    pub trades: u64,
    /// Записано обогащённых котировок
    pub records: u64,
    /// Отброшено (чужие символы, прочие типы)
    pub dropped: u64,
}

/// Обработка входного файла прервана; всё, что записано до ошибки, остаётся.
#[derive(Debug, Error)]
#[error("input aborted after {} events: {source}", .stats.events)]
pub struct Aborted {
    /// Счётчики на момент ошибки
    pub stats: EnrichStats,
    /// Причина
    #[source]
    pub source: CoreError,
}

/// Сливает сделки и котировки отслеживаемых символов в обогащённые записи.
#[derive(Debug, Clone, Copy)]
pub struct Enricher<'a> {
    filter: &'a SymbolFilter,
    index_prefix: Option<&'a str>,
}

impl<'a> Enricher<'a> {
    pub fn new(filter: &'a SymbolFilter) -> Self {
        Self {
            filter,
            index_prefix: None,
        }
    }

    /// Префикс `_index` в action-дескрипторах; `None` - только `_type`
    pub fn with_index_prefix(mut self, prefix: Option<&'a str>) -> Self {
        self.index_prefix = prefix;
        self
    }

    /// Один шаг автомата. Сделка только обновляет состояние,
    /// котировка даёт запись.
    pub fn apply(&self, event: &Event, store: &mut SymbolStore) -> Option<EnrichedRecord> {
        match event {
            Event::Trade(t) if self.filter.contains(&t.symbol) => {
                store.entry(&t.symbol).record_trade(t);
                None
            }
            Event::Quote(q) if self.filter.contains(&q.symbol) => Some(store.entry(&q.symbol).enrich(q)),
            Event::Trade(_) | Event::Quote(_) | Event::OfficialPrice(_) | Event::Other { .. } => None,
        }
    }

    /// Прогнать источник до конца потока.
    ///
    /// Ошибка декодирования или записи прерывает файл; открытые bulk-файлы
    /// при этом не закрываются - это делает `SymbolStore`.
    pub fn run<S, P>(
        &self,
        source: &mut S,
        store: &mut SymbolStore,
        writer: &mut BulkWriter<P>,
    ) -> Result<EnrichStats, Aborted>
    where
        S: EventSource + ?Sized,
        P: ProgressSink,
    {
        let mut stats = EnrichStats::default();

        loop {
            let event = match source.next_event() {
                Ok(Some(ev)) => ev,
                Ok(None) => break,
                Err(e) => {
                    return Err(Aborted {
                        stats,
                        source: e.into(),
                    });
                }
            };
            stats.events += 1;

            let is_trade = matches!(event, Event::Trade(_));
            match self.apply(&event, store) {
                Some(record) => {
                    let action = ActionDescriptor::for_record(&record, self.index_prefix);
                    let state = store.entry(&record.symbol);
                    if let Err(e) = writer.emit(state, &action, &record) {
                        return Err(Aborted { stats, source: e });
                    }
                    stats.records += 1;
                }
                None if is_trade && event.symbol().is_some_and(|s| self.filter.contains(s)) => {
                    stats.trades += 1;
                }
                None => {
                    stats.dropped += 1;
                }
            }
        }

        debug!(
            "events={} trades={} records={} dropped={}",
            stats.events, stats.trades, stats.records, stats.dropped
        );
        Ok(stats)
    }
}
