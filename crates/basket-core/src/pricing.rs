//! # Pricing
//!
//! Resolves what a cart line costs.
//!
//! Cart items only carry a relation. The price lives with whatever external
//! registry owns that relation type, so the cart keeps a mapping
//! `relation_type → provider` and asks the provider at read time.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    line_amount(item)                                    │
//! │                                                                         │
//! │  providers[item.relation_type]                                         │
//! │       │                                                                 │
//! │       ├── none ──► MisconfiguredItemType   (warn + Err)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  provider.find_by_id(item.relation_id)                                 │
//! │       │                                                                 │
//! │       ├── none ──► RelatedItemNotFound     (Err)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AmountSource::Fixed(m)    → m                                         │
//! │  AmountSource::Computed(f) → f()                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  unit × item.quantity                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CartItem, Relation};

// =============================================================================
// Amount Source
// =============================================================================

/// How a provider-returned entity reports its unit amount.
#[derive(Clone)]
pub enum AmountSource {
    /// A stored amount.
    Fixed(Money),
    /// An amount computed on every read (discounts, live prices).
    Computed(Arc<dyn Fn() -> Money + Send + Sync>),
}

impl AmountSource {
    pub fn fixed(amount: Money) -> Self {
        AmountSource::Fixed(amount)
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> Money + Send + Sync + 'static,
    {
        AmountSource::Computed(Arc::new(f))
    }

    /// Reads the current unit amount.
    pub fn resolve(&self) -> Money {
        match self {
            AmountSource::Fixed(amount) => *amount,
            AmountSource::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for AmountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountSource::Fixed(amount) => f.debug_tuple("Fixed").field(amount).finish(),
            AmountSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

// =============================================================================
// Item-Type Provider
// =============================================================================

/// Lookup service for one relation type.
pub trait ItemTypeProvider: Send + Sync {
    /// Returns the amount source of the entity with this id, if it exists.
    fn find_by_id(&self, id: &str) -> Option<AmountSource>;
}

/// A provider backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    entries: HashMap<String, AmountSource>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: impl Into<String>, amount: AmountSource) -> Self {
        self.entries.insert(id.into(), amount);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, amount: AmountSource) {
        self.entries.insert(id.into(), amount);
    }

    pub fn into_shared(self) -> Arc<dyn ItemTypeProvider> {
        Arc::new(self)
    }
}

impl ItemTypeProvider for StaticProvider {
    fn find_by_id(&self, id: &str) -> Option<AmountSource> {
        self.entries.get(id).cloned()
    }
}

// =============================================================================
// Pricing Registry
// =============================================================================

/// Mapping from relation type to its provider.
#[derive(Clone, Default)]
pub struct PricingRegistry {
    providers: HashMap<String, Arc<dyn ItemTypeProvider>>,
}

impl PricingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merges `providers` into the registry.
    ///
    /// A later call replaces the provider of any relation type it names and
    /// leaves the others untouched.
    pub fn configure<I>(&mut self, providers: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn ItemTypeProvider>)>,
    {
        self.providers.extend(providers);
    }

    /// True if a provider is registered for `relation_type`.
    pub fn is_configured(&self, relation_type: &str) -> bool {
        self.providers.contains_key(relation_type)
    }

    /// Registered relation types, sorted.
    pub fn relation_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Looks up the entity a relation refers to.
    pub fn item_doc(&self, relation: &Relation) -> CoreResult<AmountSource> {
        let Some(provider) = self.providers.get(&relation.relation_type) else {
            warn!(
                relation_type = %relation.relation_type,
                "Cart misconfigured, item type was added but not configured"
            );
            return Err(CoreError::MisconfiguredItemType {
                relation_type: relation.relation_type.clone(),
            });
        };

        provider
            .find_by_id(&relation.relation_id)
            .ok_or_else(|| CoreError::RelatedItemNotFound {
                relation_type: relation.relation_type.clone(),
                relation_id: relation.relation_id.clone(),
            })
    }

    /// Unit amount of the entity a relation refers to.
    pub fn unit_amount(&self, relation: &Relation) -> CoreResult<Money> {
        self.item_doc(relation).map(|source| source.resolve())
    }

    /// Unit amount × quantity for one line.
    pub fn line_amount(&self, item: &CartItem) -> CoreResult<Money> {
        let unit = self.unit_amount(&item.relation())?;
        unit.checked_multiply_quantity(item.quantity)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: format!("{} × {}", item.relation(), item.quantity),
            })
    }

    /// Sum of line amounts. Fails on the first line that cannot be priced.
    pub fn total<'a, I>(&self, items: I) -> CoreResult<Money>
    where
        I: IntoIterator<Item = &'a CartItem>,
    {
        items.into_iter().try_fold(Money::zero(), |total, item| {
            let line = self.line_amount(item)?;
            total
                .checked_add(line)
                .ok_or_else(|| CoreError::AmountOverflow {
                    context: "cart total".to_string(),
                })
        })
    }
}

impl fmt::Debug for PricingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PricingRegistry")
            .field("relation_types", &self.relation_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn products(amount: i64) -> (String, Arc<dyn ItemTypeProvider>) {
        (
            "product".to_string(),
            StaticProvider::new()
                .with("p1", AmountSource::fixed(Money::from_cents(amount)))
                .into_shared(),
        )
    }

    #[test]
    fn test_fixed_amount_times_quantity() {
        let mut registry = PricingRegistry::new();
        registry.configure([products(10)]);

        let item = CartItem::local("product", "p1", 5);
        assert_eq!(registry.line_amount(&item).unwrap(), Money::from_cents(50));
    }

    #[test]
    fn test_computed_amount_is_read_each_time() {
        let price = Arc::new(AtomicI64::new(100));
        let reader = price.clone();
        let provider = StaticProvider::new().with(
            "plan-a",
            AmountSource::computed(move || Money::from_cents(reader.load(Ordering::SeqCst))),
        );

        let mut registry = PricingRegistry::new();
        registry.configure([("subscription".to_string(), provider.into_shared())]);

        let item = CartItem::local("subscription", "plan-a", 2);
        assert_eq!(registry.line_amount(&item).unwrap().cents(), 200);

        price.store(150, Ordering::SeqCst);
        assert_eq!(registry.line_amount(&item).unwrap().cents(), 300);
    }

    #[test]
    fn test_unconfigured_type_is_an_error() {
        let registry = PricingRegistry::new();
        let item = CartItem::local("gift-card", "g1", 1);
        let err = registry.line_amount(&item).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MisconfiguredItemType { ref relation_type } if relation_type == "gift-card"
        ));
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let mut registry = PricingRegistry::new();
        registry.configure([products(10)]);
        let err = registry
            .line_amount(&CartItem::local("product", "missing", 1))
            .unwrap_err();
        assert!(matches!(err, CoreError::RelatedItemNotFound { .. }));
    }

    #[test]
    fn test_configure_is_shallow_merge() {
        let mut registry = PricingRegistry::new();
        registry.configure([products(10)]);
        registry.configure([(
            "subscription".to_string(),
            StaticProvider::new()
                .with("s1", AmountSource::fixed(Money::from_cents(7)))
                .into_shared(),
        )]);
        assert_eq!(registry.relation_types(), vec!["product", "subscription"]);

        // Overriding one key keeps the other.
        registry.configure([products(20)]);
        let item = CartItem::local("product", "p1", 1);
        assert_eq!(registry.line_amount(&item).unwrap().cents(), 20);
        assert!(registry.is_configured("subscription"));
    }

    #[test]
    fn test_total() {
        let mut registry = PricingRegistry::new();
        registry.configure([products(10)]);
        let items = vec![
            CartItem::local("product", "p1", 2),
            CartItem::local("product", "p1", 3),
        ];
        assert_eq!(registry.total(&items).unwrap().cents(), 50);
        assert!(registry.total(Vec::<&CartItem>::new()).unwrap().is_zero());

        let with_bad = vec![
            CartItem::local("product", "p1", 2),
            CartItem::local("unknown", "x", 1),
        ];
        assert!(registry.total(&with_bad).is_err());
    }

    #[test]
    fn test_oversized_amounts_are_errors() {
        let mut registry = PricingRegistry::new();
        registry.configure([products(1000)]);

        let huge = CartItem::local("product", "p1", 10_i64.pow(16));
        assert!(matches!(
            registry.line_amount(&huge),
            Err(CoreError::AmountOverflow { .. })
        ));

        let near_max = CartItem::local("product", "p1", i64::MAX / 1000);
        let items = vec![near_max.clone(), near_max];
        assert!(matches!(
            registry.total(&items),
            Err(CoreError::AmountOverflow { .. })
        ));
    }
}
