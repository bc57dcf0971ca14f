use std::{collections::BTreeSet, sync::Arc};

use crate::{api::types::RegistrantTypeStat, error::StorageError, utils::storage::KeyValueStore};

use super::category_filter_key;

/// Ticket categories allowed to check in at one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    pub all_selected: bool,
    pub selected_ids: BTreeSet<i64>,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl CategoryFilter {
    pub fn all() -> Self {
        Self {
            all_selected: true,
            selected_ids: BTreeSet::new(),
        }
    }

    pub fn only(ids: impl IntoIterator<Item = i64>) -> Self {
        let selected_ids: BTreeSet<i64> = ids.into_iter().collect();
        if selected_ids.is_empty() {
            return Self::all();
        }
        Self {
            all_selected: false,
            selected_ids,
        }
    }

    /// Ids sent with a registration; empty means "no restriction".
    pub fn registrant_type_ids(&self) -> Vec<i64> {
        if self.all_selected {
            Vec::new()
        } else {
            self.selected_ids.iter().copied().collect()
        }
    }

    pub fn toggle_all(&mut self, categories: &[RegistrantTypeStat]) {
        self.all_selected = !self.all_selected;
        if self.all_selected {
            self.selected_ids = categories.iter().map(|c| c.category_id()).collect();
        }
    }

    /// Ticks or unticks one category. Leaving the "all" state starts from
    /// every id in `categories`, so unticking removes just that one.
    pub fn toggle(&mut self, id: i64, categories: &[RegistrantTypeStat]) {
        if self.all_selected {
            self.selected_ids = categories.iter().map(|c| c.category_id()).collect();
        }
        if !self.selected_ids.remove(&id) {
            self.selected_ids.insert(id);
        }
        self.all_selected = !categories.is_empty()
            && categories
                .iter()
                .all(|c| self.selected_ids.contains(&c.category_id()));
    }

    /// An explicit selection with no category cannot be stored.
    pub fn can_save(&self) -> bool {
        self.all_selected || !self.selected_ids.is_empty()
    }
}

/// Per-session persisted category selection.
#[derive(Clone)]
pub struct CategoryFilterStore {
    storage: Arc<dyn KeyValueStore>,
}

impl CategoryFilterStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn load(&self, session_id: i64) -> Result<CategoryFilter, StorageError> {
        let Some(raw) = self.storage.get(&category_filter_key(session_id))? else {
            return Ok(CategoryFilter::all());
        };
        match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(ids) => Ok(CategoryFilter::only(ids)),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "Ignoring undecodable category filter");
                Ok(CategoryFilter::all())
            }
        }
    }

    pub fn save(&self, session_id: i64, filter: &CategoryFilter) -> Result<(), StorageError> {
        if !filter.can_save() {
            return Err(StorageError::EmptySelection);
        }
        let ids = filter.registrant_type_ids();
        self.storage
            .set(&category_filter_key(session_id), &serde_json::to_string(&ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::storage::MemoryStore;

    fn category(id: i64) -> RegistrantTypeStat {
        RegistrantTypeStat {
            id,
            name: format!("cat-{id}"),
            price: 0.0,
            stock: None,
            used: None,
            available: None,
            is_active: true,
            registered: None,
            checkins: None,
            registrant_type: None,
        }
    }

    #[test]
    fn all_selected_sends_empty_ids() {
        let filter = CategoryFilter::all();
        assert!(filter.registrant_type_ids().is_empty());
        assert_eq!(CategoryFilter::only([3, 1]).registrant_type_ids(), vec![1, 3]);
        assert_eq!(CategoryFilter::only([]), CategoryFilter::all());
    }

    #[test]
    fn toggling_tracks_all_selected() {
        let categories = vec![category(1), category(2)];
        let mut filter = CategoryFilter::all();
        filter.toggle_all(&categories);
        assert!(!filter.all_selected);
        assert!(!filter.can_save());

        filter.toggle(1, &categories);
        assert!(!filter.all_selected);
        assert_eq!(filter.registrant_type_ids(), vec![1]);

        filter.toggle(2, &categories);
        assert!(filter.all_selected);
        assert!(filter.registrant_type_ids().is_empty());

        filter.toggle(2, &categories);
        assert_eq!(filter.registrant_type_ids(), vec![1]);

        filter.toggle_all(&categories);
        assert!(filter.all_selected);
        assert_eq!(filter.selected_ids, BTreeSet::from([1, 2]));
    }

    #[test]
    fn unticking_from_all_keeps_the_others() {
        let categories = vec![category(1), category(2), category(3)];
        let storage = Arc::new(MemoryStore::new());
        let store = CategoryFilterStore::new(storage);
        store.save(7, &CategoryFilter::all()).unwrap();

        let mut filter = store.load(7).unwrap();
        filter.toggle(1, &categories);
        assert!(!filter.all_selected);
        assert_eq!(filter.registrant_type_ids(), vec![2, 3]);

        filter.toggle(1, &categories);
        assert!(filter.all_selected);
    }

    #[test]
    fn empty_selection_is_not_saved() {
        let categories = vec![category(1)];
        let storage = Arc::new(MemoryStore::new());
        let store = CategoryFilterStore::new(storage.clone());
        store.save(7, &CategoryFilter::only([1])).unwrap();

        let mut filter = CategoryFilter::all();
        filter.toggle(1, &categories);
        assert!(filter.selected_ids.is_empty());
        assert!(!filter.can_save());
        assert!(matches!(store.save(7, &filter), Err(StorageError::EmptySelection)));
        assert_eq!(storage.get("categoryFilter_7").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn store_round_trips_per_session() {
        let storage = Arc::new(MemoryStore::new());
        let store = CategoryFilterStore::new(storage.clone());
        assert_eq!(store.load(7).unwrap(), CategoryFilter::all());

        store.save(7, &CategoryFilter::only([2, 5])).unwrap();
        assert_eq!(storage.get("categoryFilter_7").unwrap().as_deref(), Some("[2,5]"));
        assert_eq!(store.load(7).unwrap(), CategoryFilter::only([2, 5]));
        assert_eq!(store.load(8).unwrap(), CategoryFilter::all());

        store.save(7, &CategoryFilter::all()).unwrap();
        assert_eq!(store.load(7).unwrap(), CategoryFilter::all());
    }
}
