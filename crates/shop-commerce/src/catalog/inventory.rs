//! Stock levels.

use serde::{Deserialize, Serialize};

/// Inventory level for a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InventoryLevel {
    pub quantity: i64,
    /// Held for orders that are not yet shipped.
    pub reserved: i64,
    pub track_inventory: bool,
    pub allow_backorder: bool,
}

impl InventoryLevel {
    /// Tracked stock with no backorders.
    pub fn new(quantity: i64) -> Self {
        Self {
            quantity,
            reserved: 0,
            track_inventory: true,
            allow_backorder: false,
        }
    }

    /// Infinite stock.
    pub fn untracked() -> Self {
        Self {
            quantity: 0,
            reserved: 0,
            track_inventory: false,
            allow_backorder: true,
        }
    }

    pub fn available(&self) -> i64 {
        self.quantity - self.reserved
    }

    pub fn can_fulfill(&self, quantity: i64) -> bool {
        if !self.track_inventory || self.allow_backorder {
            return true;
        }
        self.available() >= quantity
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.track_inventory && !self.allow_backorder && self.available() <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_inventory() {
        let mut inv = InventoryLevel::new(10);
        assert!(inv.can_fulfill(10));
        assert!(!inv.can_fulfill(11));

        inv.reserved = 10;
        assert!(inv.is_out_of_stock());
        assert!(!inv.can_fulfill(1));
    }

    #[test]
    fn test_backorder_always_fulfils() {
        let mut inv = InventoryLevel::new(0);
        inv.allow_backorder = true;
        assert!(inv.can_fulfill(50));
        assert!(!inv.is_out_of_stock());
    }

    #[test]
    fn test_untracked_inventory() {
        let inv = InventoryLevel::untracked();
        assert!(inv.can_fulfill(1000));
        assert!(!inv.is_out_of_stock());
    }
}
