use std::collections::HashMap;

use connwatch_types::{SortSpec, parse_sorting_preference};
use parking_lot::RwLock;

pub const QUICK_FILTER_KEY: &str = "quick_filter";
pub const SORTING_KEY: &str = "sorting";

/// Key-value store that owns user preferences. The pipeline only reads it.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values.write().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

/// Filter and sort preferences as read for one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewPrefs {
    pub filter: Option<String>,
    pub sort: Option<SortSpec>,
}

impl ViewPrefs {
    pub fn load(store: &dyn PreferenceStore) -> Self {
        Self {
            filter: store.get(QUICK_FILTER_KEY).filter(|text| !text.is_empty()),
            sort: store
                .get(SORTING_KEY)
                .and_then(|text| parse_sorting_preference(&text)),
        }
    }
}
