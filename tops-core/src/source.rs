use std::collections::VecDeque;

use crate::error::WireError;
use crate::types::Event;

/// Граница декодера: pull-источник событий одного входного файла.
///
/// `Ok(None)` - конец потока, `Err` - ошибка декодирования; после ошибки
/// источник дальше не читают.
pub trait EventSource {
    /// Следующее событие
    fn next_event(&mut self) -> Result<Option<Event>, WireError>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_event(&mut self) -> Result<Option<Event>, WireError> {
        (**self).next_event()
    }
}

/// Источник в памяти: заранее заданная последовательность событий
/// и, при необходимости, ошибок.
#[derive(Debug, Default)]
pub struct MemorySource {
    items: VecDeque<Result<Event, WireError>>,
}

impl MemorySource {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            items: events.into_iter().map(Ok).collect(),
        }
    }

    /// Добавить ошибку декодирования в конец очереди
    pub fn then_fail(mut self, err: WireError) -> Self {
        self.items.push_back(Err(err));
        self
    }
}

impl EventSource for MemorySource {
    fn next_event(&mut self) -> Result<Option<Event>, WireError> {
        self.items.pop_front().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_yields_events_then_end() {
        let mut src = MemorySource::new(vec![Event::Other { kind: 1 }, Event::Other { kind: 2 }]);
        assert_eq!(src.next_event().unwrap(), Some(Event::Other { kind: 1 }));
        assert_eq!(src.next_event().unwrap(), Some(Event::Other { kind: 2 }));
        assert_eq!(src.next_event().unwrap(), None);
        assert_eq!(src.next_event().unwrap(), None);
    }

    #[test]
    fn memory_source_reports_error_in_order() {
        let mut src = MemorySource::new(vec![Event::Other { kind: 1 }])
            .then_fail(WireError::BadMagic);
        assert!(src.next_event().unwrap().is_some());
        assert!(matches!(src.next_event(), Err(WireError::BadMagic)));
        assert_eq!(src.next_event().unwrap(), None);
    }
}
