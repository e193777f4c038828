//! Basket and basket element types.

use crate::basket::{BasketPricing, ElementPricing};
use crate::current_timestamp;
use crate::error::CommerceError;
use crate::ids::{BasketElementId, BasketId, CustomerId, ProductId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A customer's in-progress selection of products.
///
/// Totals are always derived from the elements. Element prices depend on the
/// whole basket, so anything that changes composition should go through the
/// product provider, which reprices afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Basket {
    pub id: BasketId,
    /// Session the basket belongs to; one basket per session.
    pub session_id: String,
    pub customer_id: Option<CustomerId>,
    pub currency: Currency,
    elements: Vec<BasketElement>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Basket {
    pub fn new(session_id: impl Into<String>, currency: Currency) -> Self {
        let now = current_timestamp();
        Self {
            id: BasketId::generate(),
            session_id: session_id.into(),
            customer_id: None,
            currency,
            elements: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_customer(&mut self, customer_id: CustomerId) {
        self.customer_id = Some(customer_id);
        self.touch();
    }

    /// Elements in position order.
    pub fn elements(&self) -> &[BasketElement] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [BasketElement] {
        &mut self.elements
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sum of quantities over all lines.
    pub fn item_count(&self) -> i64 {
        self.elements.iter().map(|e| e.quantity).sum()
    }

    pub fn get(&self, id: &BasketElementId) -> Option<&BasketElement> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &BasketElementId) -> Option<&mut BasketElement> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    pub fn has_product(&self, product_id: &ProductId) -> bool {
        self.elements
            .iter()
            .any(|e| e.product_id.as_ref() == Some(product_id))
    }

    /// The line a new selection of `product_id` with `options` would merge into.
    pub fn find_matching(
        &self,
        product_id: &ProductId,
        options: &BTreeMap<String, String>,
    ) -> Option<&BasketElement> {
        self.elements.iter().find(|e| e.matches(product_id, options))
    }

    pub(crate) fn find_matching_mut(
        &mut self,
        product_id: &ProductId,
        options: &BTreeMap<String, String>,
    ) -> Option<&mut BasketElement> {
        self.elements
            .iter_mut()
            .find(|e| e.matches(product_id, options))
    }

    /// Append as the last line. Does not reprice.
    pub fn push_element(&mut self, mut element: BasketElement) -> BasketElementId {
        element.position = self.elements.len() as u32;
        let id = element.id.clone();
        self.elements.push(element);
        self.touch();
        id
    }

    /// Remove a line and renumber the rest. Does not reprice.
    pub fn remove_element(&mut self, id: &BasketElementId) -> Option<BasketElement> {
        let index = self.elements.iter().position(|e| &e.id == id)?;
        let removed = self.elements.remove(index);
        self.renumber();
        self.touch();
        Some(removed)
    }

    /// Swap in a validated copy of an existing line, keeping its position.
    pub fn replace_element(&mut self, element: BasketElement) -> Result<(), CommerceError> {
        let slot = self
            .elements
            .iter_mut()
            .find(|e| e.id == element.id)
            .ok_or_else(|| CommerceError::ElementNotInBasket(element.id.to_string()))?;
        let position = slot.position;
        *slot = element;
        slot.position = position;
        self.touch();
        Ok(())
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.touch();
    }

    /// Sum of line totals at current unit prices.
    pub fn total(&self) -> Result<Money, CommerceError> {
        let mut total = Money::zero(self.currency);
        for element in &self.elements {
            let line = element.total()?;
            total = total
                .checked_add(&line)
                .ok_or_else(|| self.mismatch(&line))?;
        }
        Ok(total)
    }

    /// Per-line breakdown of base vs. effective prices.
    pub fn pricing(&self) -> Result<BasketPricing, CommerceError> {
        let lines = self
            .elements
            .iter()
            .map(|e| {
                Ok(ElementPricing {
                    element_id: e.id.clone(),
                    quantity: e.quantity,
                    base_unit_price: e.base_price,
                    unit_price: e.unit_price,
                    subtotal: e.base_total()?,
                    total: e.total()?,
                })
            })
            .collect::<Result<Vec<_>, CommerceError>>()?;

        let subtotal = Money::try_sum(lines.iter().map(|l| &l.subtotal), self.currency)
            .ok_or(CommerceError::Overflow)?;
        let grand_total = Money::try_sum(lines.iter().map(|l| &l.total), self.currency)
            .ok_or(CommerceError::Overflow)?;
        let discount_total = subtotal
            .checked_sub(&grand_total)
            .ok_or(CommerceError::Overflow)?;

        Ok(BasketPricing {
            subtotal,
            discount_total,
            grand_total,
            lines,
        })
    }

    fn renumber(&mut self) {
        for (position, element) in self.elements.iter_mut().enumerate() {
            element.position = position as u32;
        }
    }

    fn mismatch(&self, money: &Money) -> CommerceError {
        if money.currency == self.currency {
            CommerceError::Overflow
        } else {
            CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: money.currency.code().to_string(),
            }
        }
    }

    fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }
}

/// One line of a basket.
///
/// Product data is denormalized at build time so a basket can be displayed
/// without the catalog; `is_valid_basket_element` compares it back against
/// the live product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasketElement {
    pub id: BasketElementId,
    /// Zero-based line position, maintained by the owning basket.
    pub position: u32,
    /// `None` until the element has been built from a product.
    pub product_id: Option<ProductId>,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Catalog price at build time.
    pub base_price: Money,
    /// Price after basket-level rules.
    pub unit_price: Money,
    pub vat_rate: f64,
    /// Distinguishing choices, part of the merge key (e.g. size=L).
    pub options: BTreeMap<String, String>,
    /// Free-form metadata merged on re-add (e.g. a gift note).
    pub properties: BTreeMap<String, String>,
    /// Set by the basket form when the user asks to drop the line.
    pub delete: bool,
}

impl BasketElement {
    /// A blank element, not yet tied to a product.
    pub fn new(currency: Currency) -> Self {
        Self {
            id: BasketElementId::generate(),
            position: 0,
            product_id: None,
            sku: String::new(),
            name: String::new(),
            quantity: 0,
            base_price: Money::zero(currency),
            unit_price: Money::zero(currency),
            vat_rate: 0.0,
            options: BTreeMap::new(),
            properties: BTreeMap::new(),
            delete: false,
        }
    }

    /// Merge rule: same product and identical options. Lines flagged for
    /// deletion never match.
    pub fn matches(&self, product_id: &ProductId, options: &BTreeMap<String, String>) -> bool {
        !self.delete && self.product_id.as_ref() == Some(product_id) && &self.options == options
    }

    /// `unit_price * quantity`.
    pub fn total(&self) -> Result<Money, CommerceError> {
        self.unit_price
            .checked_mul(self.quantity)
            .ok_or(CommerceError::Overflow)
    }

    /// `base_price * quantity`.
    pub fn base_total(&self) -> Result<Money, CommerceError> {
        self.base_price
            .checked_mul(self.quantity)
            .ok_or(CommerceError::Overflow)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(product: &str, quantity: i64, cents: i64) -> BasketElement {
        let mut e = BasketElement::new(Currency::EUR);
        e.product_id = Some(ProductId::new(product));
        e.quantity = quantity;
        e.base_price = Money::new(cents, Currency::EUR);
        e.unit_price = e.base_price;
        e
    }

    #[test]
    fn test_basket_creation() {
        let basket = Basket::new("session-123", Currency::EUR);
        assert!(basket.is_empty());
        assert_eq!(basket.session_id, "session-123");
        assert_eq!(basket.total().unwrap(), Money::zero(Currency::EUR));
    }

    #[test]
    fn test_push_and_remove_renumbers() {
        let mut basket = Basket::new("s", Currency::EUR);
        let a = basket.push_element(element("a", 1, 100));
        let b = basket.push_element(element("b", 2, 200));
        let c = basket.push_element(element("c", 3, 300));

        assert_eq!(basket.get(&c).unwrap().position, 2);
        assert!(basket.remove_element(&b).is_some());
        assert_eq!(basket.get(&a).unwrap().position, 0);
        assert_eq!(basket.get(&c).unwrap().position, 1);
        assert!(basket.remove_element(&b).is_none());
        assert_eq!(basket.item_count(), 4);
    }

    #[test]
    fn test_totals() {
        let mut basket = Basket::new("s", Currency::EUR);
        basket.push_element(element("a", 2, 1000));
        let mut discounted = element("b", 1, 2000);
        discounted.unit_price = Money::new(1500, Currency::EUR);
        basket.push_element(discounted);

        assert_eq!(basket.total().unwrap().amount_cents, 3500);

        let pricing = basket.pricing().unwrap();
        assert_eq!(pricing.subtotal.amount_cents, 4000);
        assert_eq!(pricing.discount_total.amount_cents, 500);
        assert_eq!(pricing.grand_total.amount_cents, 3500);
        assert_eq!(pricing.lines.len(), 2);
    }

    #[test]
    fn test_total_currency_mismatch() {
        let mut basket = Basket::new("s", Currency::EUR);
        let mut e = element("a", 1, 100);
        e.unit_price = Money::new(100, Currency::USD);
        basket.push_element(e);
        assert!(matches!(
            basket.total(),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_matching_uses_options() {
        let mut basket = Basket::new("s", Currency::EUR);
        let mut large = element("shirt", 1, 100);
        large.options.insert("size".into(), "L".into());
        basket.push_element(large);

        let mut options = BTreeMap::new();
        assert!(basket.find_matching(&ProductId::new("shirt"), &options).is_none());
        options.insert("size".to_string(), "L".to_string());
        assert!(basket.find_matching(&ProductId::new("shirt"), &options).is_some());
        assert!(basket.has_product(&ProductId::new("shirt")));
    }

    #[test]
    fn test_lines_flagged_for_deletion_do_not_match() {
        let mut basket = Basket::new("s", Currency::EUR);
        let id = basket.push_element(element("shirt", 1, 100));
        let options = BTreeMap::new();
        assert!(basket.find_matching(&ProductId::new("shirt"), &options).is_some());

        basket.get_mut(&id).unwrap().delete = true;
        assert!(basket.find_matching(&ProductId::new("shirt"), &options).is_none());
        assert!(basket
            .find_matching_mut(&ProductId::new("shirt"), &options)
            .is_none());
    }

    #[test]
    fn test_replace_element_keeps_position() {
        let mut basket = Basket::new("s", Currency::EUR);
        basket.push_element(element("a", 1, 100));
        let id = basket.push_element(element("b", 1, 100));

        let mut copy = basket.get(&id).unwrap().clone();
        copy.quantity = 7;
        copy.position = 99;
        basket.replace_element(copy).unwrap();

        let replaced = basket.get(&id).unwrap();
        assert_eq!(replaced.quantity, 7);
        assert_eq!(replaced.position, 1);

        let stranger = element("z", 1, 1);
        assert!(matches!(
            basket.replace_element(stranger),
            Err(CommerceError::ElementNotInBasket(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut basket = Basket::new("s", Currency::EUR);
        basket.push_element(element("a", 1, 100));
        basket.clear();
        assert!(basket.is_empty());
    }
}
