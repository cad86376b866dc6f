/*
[INPUT]:  Seed quotes and streamed trade ticks
[OUTPUT]: Bounded newest-first tick history for display
[POS]:    Data layer - in-memory tick retention
[UPDATE]: When changing retention or display row fields
*/

use rust_decimal::Decimal;
use std::collections::VecDeque;
use uuid::Uuid;

/// One display row: a streamed trade or a quote seed.
///
/// `dedup_token` is generated client-side and only disambiguates rows when
/// symbol/price/time collide; it carries no semantic meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub timestamp_millis: i64,
    pub dedup_token: Uuid,
}

impl PriceTick {
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        volume: Decimal,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            timestamp_millis,
            dedup_token: Uuid::new_v4(),
        }
    }
}

/// Bounded tick history, newest first. Oldest entries are evicted once the
/// capacity is exceeded.
#[derive(Debug)]
pub struct TickBuffer {
    ticks: VecDeque<PriceTick>,
    capacity: usize,
}

impl TickBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a single tick
    pub fn push_front(&mut self, tick: PriceTick) {
        if self.capacity == 0 {
            return;
        }
        self.ticks.push_front(tick);
        self.ticks.truncate(self.capacity);
    }

    /// Prepend a whole batch, preserving its internal order so the batch's
    /// first element ends up at the front.
    pub fn push_front_batch(&mut self, batch: Vec<PriceTick>) {
        for tick in batch.into_iter().rev() {
            self.ticks.push_front(tick);
        }
        self.ticks.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Clone out the current contents, newest first
    pub fn snapshot(&self) -> Vec<PriceTick> {
        self.ticks.iter().cloned().collect()
    }
}
