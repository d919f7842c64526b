//! Record types held by the storage collaborators.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in the smallest currency unit.
    pub price_cents: u64,
    pub tags: Vec<String>,
}

/// One product line in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price_cents: u64,
    pub note: Option<String>,
}

impl CartLine {
    #[must_use]
    pub fn subtotal_cents(&self) -> u64 {
        self.unit_price_cents.saturating_mul(u64::from(self.quantity))
    }
}

/// Everything a user has put in their cart, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: String,
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn total_cents(&self) -> u64 {
        self.lines
            .iter()
            .map(CartLine::subtotal_cents)
            .fold(0, u64::saturating_add)
    }

    /// Adds `line`, merging quantities with an existing line for the same product.
    pub fn add(&mut self, line: CartLine) {
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.unit_price_cents = line.unit_price_cents;
                if line.note.is_some() {
                    existing.note = line.note;
                }
            }
            None => self.lines.push(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn line(product_id: Uuid, quantity: u32, price: u64) -> CartLine {
        CartLine {
            product_id,
            quantity,
            unit_price_cents: price,
            note: None,
        }
    }

    #[test]
    fn adding_same_product_merges_quantity() {
        let id = Uuid::new_v4();
        let mut cart = Cart::empty("u-1");
        cart.add(line(id, 2, 150));
        cart.add(line(id, 3, 150));
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.total_cents(), 750);
    }

    #[test]
    fn lines_keep_insertion_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::empty("u-1");
        cart.add(line(b, 1, 100));
        cart.add(line(a, 1, 200));
        let order: Vec<_> = cart.lines.iter().map(|l| l.product_id).collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(cart.total_cents(), 300);
    }

    proptest! {
        #[test]
        fn merged_quantity_is_sum_of_adds(quantities in proptest::collection::vec(1u32..1000, 1..20)) {
            let id = Uuid::new_v4();
            let mut cart = Cart::empty("u-1");
            for &q in &quantities {
                cart.add(line(id, q, 25));
            }
            let expected: u32 = quantities.iter().sum();
            prop_assert_eq!(cart.lines.len(), 1);
            prop_assert_eq!(cart.lines[0].quantity, expected);
            prop_assert_eq!(cart.total_cents(), u64::from(expected) * 25);
        }
    }
}
