//! Aggregator selection by configured kind

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    aggregator::DexAggregator,
    errors::{GridError, GridResult},
    types::AggregatorKind,
};

#[derive(Default, Clone)]
pub struct AggregatorRegistry {
    entries: HashMap<AggregatorKind, Arc<dyn DexAggregator>>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, aggregator: Arc<dyn DexAggregator>) {
        self.entries.insert(aggregator.kind(), aggregator);
    }

    pub fn get(&self, kind: AggregatorKind) -> GridResult<Arc<dyn DexAggregator>> {
        self.entries
            .get(&kind)
            .cloned()
            .ok_or_else(|| GridError::UnsupportedAggregator { name: kind.to_string() })
    }
}
