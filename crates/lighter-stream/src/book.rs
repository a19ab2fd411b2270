/*
[INPUT]:  Order book events from the public stream
[OUTPUT]: Local top-of-book view for logging
[POS]:    Display layer - best bid/ask and spread per market
[UPDATE]: When changing how books are summarized
*/

use std::collections::BTreeMap;

use lighter_adapter::{OrderBookEvent, PriceLevel};
use rust_decimal::Decimal;
use tracing::warn;

/// Best bid/ask snapshot derived from a [`LocalBook`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl Quote {
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask? - self.best_bid?)
    }
}

/// Price-keyed depth rebuilt from snapshots and updates; display only
#[derive(Debug, Default, Clone)]
pub struct LocalBook {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    offset: i64,
}

impl LocalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots replace the book; updates overwrite levels and drop zero-size ones
    pub fn apply(&mut self, event: &OrderBookEvent) {
        if event.is_snapshot {
            self.bids.clear();
            self.asks.clear();
        }
        apply_levels(&mut self.bids, &event.bids);
        apply_levels(&mut self.asks, &event.asks);
        self.offset = event.offset;
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn quote(&self) -> Quote {
        Quote {
            best_bid: self.bids.keys().next_back().copied(),
            best_ask: self.asks.keys().next().copied(),
        }
    }
}

fn apply_levels(side: &mut BTreeMap<Decimal, Decimal>, levels: &[PriceLevel]) {
    for level in levels {
        let (Ok(price), Ok(quantity)) = (level.price_decimal(), level.quantity_decimal()) else {
            warn!(price = %level.price, quantity = %level.quantity, "unparseable level ignored");
            continue;
        };
        if quantity.is_zero() {
            side.remove(&price);
        } else {
            side.insert(price, quantity);
        }
    }
}
