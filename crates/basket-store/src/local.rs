//! # Local Collection
//!
//! The device-only cart used while anonymous. Items carry no owner; every
//! write is persisted to an optional [`SnapshotFile`].

use basket_core::validation::{validate_new_item, validate_updated_quantity};
use basket_core::{CartItem, CartQuery, CollectionKind, ItemPatch, NewCartItem};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::collection::{CartCollection, ItemTable};
use crate::error::StoreResult;
use crate::snapshot::SnapshotFile;

/// Anonymous cart collection.
///
/// ## Persistence
/// With a snapshot attached, each successful write rewrites the file. If that
/// save fails the in-memory write is kept and the error is returned, so the
/// caller learns the device copy is stale.
#[derive(Debug, Default)]
pub struct LocalCollection {
    table: ItemTable,
    snapshot: Option<SnapshotFile>,
}

impl LocalCollection {
    /// A collection that is not persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the collection backed by `snapshot`, loading any saved items.
    pub fn open(snapshot: SnapshotFile) -> StoreResult<Self> {
        let items = snapshot.load()?;
        Ok(LocalCollection {
            table: ItemTable::with_items(items),
            snapshot: Some(snapshot),
        })
    }

    pub fn snapshot(&self) -> Option<&SnapshotFile> {
        self.snapshot.as_ref()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn persist(&self) -> StoreResult<()> {
        let Some(ref snapshot) = self.snapshot else {
            return Ok(());
        };
        snapshot.save(&self.table.all()).inspect_err(|e| {
            error!(error = %e, path = ?snapshot.path(), "Failed to persist local cart");
        })
    }
}

impl CartCollection for LocalCollection {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Local
    }

    fn find(&self, query: &CartQuery) -> StoreResult<Vec<CartItem>> {
        Ok(self.table.select(query))
    }

    fn insert(&self, item: NewCartItem) -> StoreResult<String> {
        validate_new_item(&item)?;

        let stored = CartItem::from_new(item, None);
        let id = stored.id.clone();
        debug!(item_id = %id, relation = %stored.relation(), "Inserting local cart item");

        self.table.push(stored);
        self.persist()?;
        Ok(id)
    }

    fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<bool> {
        let Some(current) = self.table.get(id) else {
            return Ok(false);
        };
        validate_updated_quantity(current.quantity, patch.resulting_quantity(current.quantity))?;

        let updated = self.table.patch(id, patch);
        if updated {
            self.persist()?;
        }
        Ok(updated)
    }

    fn remove(&self, query: &CartQuery) -> StoreResult<usize> {
        let removed = self.table.take_where(|item| query.matches(item)).len();
        if removed > 0 {
            debug!(count = removed, "Removed local cart items");
            self.persist()?;
        }
        Ok(removed)
    }

    fn version(&self) -> u64 {
        self.table.version()
    }

    fn watch(&self) -> watch::Receiver<u64> {
        self.table.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_insert_assigns_unowned_ids() {
        let local = LocalCollection::in_memory();
        let id = local.insert(NewCartItem::new("product", "p1", 2)).unwrap();

        let item = local.find_one(&CartQuery::id(id.clone())).unwrap().unwrap();
        assert_eq!(item.id, id);
        assert!(item.owner_id.is_none());
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_insert_validates_shape() {
        let local = LocalCollection::in_memory();
        let err = local.insert(NewCartItem::new("product", "p1", 0)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(local.is_empty());
    }

    #[test]
    fn test_update_and_remove() {
        let local = LocalCollection::in_memory();
        let id = local.insert(NewCartItem::new("product", "p1", 2)).unwrap();

        assert!(local.update(&id, ItemPatch::IncrementQuantity(3)).unwrap());
        assert_eq!(local.find(&CartQuery::all()).unwrap()[0].quantity, 5);
        assert!(!local.update("missing", ItemPatch::IncrementQuantity(1)).unwrap());
        assert!(local.update(&id, ItemPatch::SetQuantity(0)).is_err());

        assert_eq!(local.remove(&CartQuery::id("missing")).unwrap(), 0);
        assert_eq!(local.remove(&CartQuery::id(id)).unwrap(), 1);
        assert!(local.is_empty());
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-cart.json");

        let id = {
            let local = LocalCollection::open(SnapshotFile::new(&path)).unwrap();
            local.insert(NewCartItem::new("product", "p1", 1)).unwrap();
            let id = local.insert(NewCartItem::new("product", "p2", 4)).unwrap();
            local.remove(&CartQuery::all().with_relation_id("p1")).unwrap();
            id
        };

        let reopened = LocalCollection::open(SnapshotFile::new(&path)).unwrap();
        let items = reopened.find(&CartQuery::all()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].quantity, 4);
    }

    #[test]
    fn test_version_counts_effective_writes() {
        let local = LocalCollection::in_memory();
        let cart: &dyn CartCollection = &local;
        assert_eq!(cart.version(), 0);

        let id = cart.insert(NewCartItem::new("product", "p1", 1)).unwrap();
        assert_eq!(cart.version(), 1);

        assert!(!cart.update("missing", ItemPatch::SetQuantity(2)).unwrap());
        assert_eq!(cart.remove(&CartQuery::id("missing")).unwrap(), 0);
        assert_eq!(cart.version(), 1);

        assert!(cart.update(&id, ItemPatch::SetQuantity(2)).unwrap());
        assert_eq!(cart.version(), 2);
    }
}
