//! The basket compatibility engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::basket::{Basket, BasketElement, BasketElementManager, DefaultBasketElementManager};
use crate::catalog::{Product, ProductCatalog};
use crate::config::EngineConfig;
use crate::error::CommerceError;
use crate::form::FormSchemaBuilder;
use crate::ids::BasketElementId;
use crate::money::Money;
use crate::provider::{forms, variation, BasketOptions, CopyScope};
use crate::validation::{ErrorCollector, ValidationErrors};

/// Result of [`ProductProvider::basket_add_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was opened.
    Appended(BasketElementId),
    /// The quantity was folded into an existing line.
    Merged(BasketElementId),
    /// The product may not enter this basket; nothing changed.
    Rejected,
}

impl AddOutcome {
    pub fn element_id(&self) -> Option<&BasketElementId> {
        match self {
            AddOutcome::Appended(id) | AddOutcome::Merged(id) => Some(id),
            AddOutcome::Rejected => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AddOutcome::Rejected)
    }
}

/// Everything a product type has to say about baskets and variations.
///
/// None of these operations keep state between calls. Callers must serialize
/// mutations of a given basket (one session, one writer).
pub trait ProductProvider {
    fn basket_element_manager(&self) -> &dyn BasketElementManager;

    /// Fields of the "add to basket" form for `product`.
    fn define_add_basket_form(
        &self,
        product: &Product,
        builder: &mut dyn FormSchemaBuilder,
        options: &BasketOptions,
    );

    /// Fields of the form editing an existing basket line.
    fn define_basket_element_form(
        &self,
        element: &BasketElement,
        builder: &mut dyn FormSchemaBuilder,
        options: &BasketOptions,
    );

    /// Add `new_element` (built for `product`) to `basket`, merging into a
    /// matching line when there is one.
    fn basket_add_product(
        &self,
        basket: &mut Basket,
        product: &Product,
        new_element: BasketElement,
    ) -> Result<AddOutcome, CommerceError>;

    /// Fold `new_element` into the line with the same product and options.
    /// Returns `None` when no line matches.
    fn basket_merge_product(
        &self,
        basket: &mut Basket,
        product: &Product,
        new_element: &BasketElement,
    ) -> Result<Option<BasketElementId>, CommerceError>;

    /// Whether `element` still agrees with the live catalog.
    fn is_valid_basket_element(&self, element: &BasketElement) -> bool;

    /// Unit price of `element` in the context of `basket`.
    fn basket_calculate_price(&self, basket: &Basket, element: &BasketElement) -> Money;

    fn is_addable_to_basket(&self, basket: &Basket, product: &Product, options: &BasketOptions)
        -> bool;

    /// New element for `product`, or for the configured default product when
    /// `product` is `None`. The element is not added to any basket.
    fn create_basket_element(
        &self,
        product: Option<&Product>,
        options: &BasketOptions,
    ) -> Result<BasketElement, CommerceError>;

    /// Refresh the element's product-derived fields. With `product` unset the
    /// element's current product is re-read from the catalog.
    fn build_basket_element(
        &self,
        element: &mut BasketElement,
        product: Option<&Product>,
        options: &BasketOptions,
    ) -> Result<(), CommerceError>;

    /// Validate a copy of `element`; the returned copy is ready to replace the
    /// original in `basket`.
    fn validate_form_basket_element(
        &self,
        element: &BasketElement,
        basket: &Basket,
    ) -> Result<BasketElement, ValidationErrors>;

    /// Add a draft variation to `product` and return it.
    fn create_variation<'a>(&self, product: &'a mut Product)
        -> Result<&'a mut Product, CommerceError>;

    fn copy_variation(&self, product: &mut Product, scope: CopyScope, force_copy: bool);

    fn copy_product_variation(&self, product: &mut Product, force_copy: bool) {
        self.copy_variation(product, CopyScope::Product, force_copy)
    }

    fn copy_product_deliveries_variation(&self, product: &mut Product, force_copy: bool) {
        self.copy_variation(product, CopyScope::ProductDeliveries, force_copy)
    }

    fn copy_product_categories_variation(&self, product: &mut Product, force_copy: bool) {
        self.copy_variation(product, CopyScope::ProductCategories, force_copy)
    }

    fn copy_product_images_variation(&self, product: &mut Product, force_copy: bool) {
        self.copy_variation(product, CopyScope::ProductImages, force_copy)
    }

    /// Recompute every unit price from one snapshot of the basket.
    fn refresh_prices(&self, basket: &mut Basket) {
        let prices: Vec<Money> = basket
            .elements()
            .iter()
            .map(|element| self.basket_calculate_price(basket, element))
            .collect();
        for (element, price) in basket.elements_mut().iter_mut().zip(prices) {
            element.unit_price = price;
        }
    }

    /// Remove a line and reprice what is left.
    fn basket_remove_element(
        &self,
        basket: &mut Basket,
        id: &BasketElementId,
    ) -> Result<BasketElement, CommerceError> {
        let removed = basket
            .remove_element(id)
            .ok_or_else(|| CommerceError::ElementNotInBasket(id.to_string()))?;
        self.refresh_prices(basket);
        info!(basket = %basket.id, element = %id, "basket line removed");
        Ok(removed)
    }
}

/// Options a line ends up with: the caller's choice, else `fallback`.
///
/// Options are free-form. The product's own options only act as defaults.
fn selected_options<'a>(
    requested: &'a BTreeMap<String, String>,
    fallback: &'a BTreeMap<String, String>,
) -> &'a BTreeMap<String, String> {
    if requested.is_empty() {
        fallback
    } else {
        requested
    }
}

/// Default [`ProductProvider`], driven by [`EngineConfig`].
pub struct BasketProductProvider {
    config: EngineConfig,
    catalog: Arc<dyn ProductCatalog>,
    element_manager: Arc<dyn BasketElementManager>,
}

impl BasketProductProvider {
    pub fn new(config: EngineConfig, catalog: Arc<dyn ProductCatalog>) -> Self {
        let element_manager = Arc::new(DefaultBasketElementManager::new(config.currency));
        Self {
            config,
            catalog,
            element_manager,
        }
    }

    pub fn with_basket_element_manager(mut self, manager: Arc<dyn BasketElementManager>) -> Self {
        self.element_manager = manager;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Why `product` may not be added, if anything.
    fn addability(
        &self,
        basket: &Basket,
        product: &Product,
        options: &BasketOptions,
    ) -> Result<(), String> {
        if !product.is_enabled() {
            return Err(format!("product is {}", product.status.as_str()));
        }
        if product.is_master() {
            return Err("a variation must be chosen".to_string());
        }
        if product.price.currency != basket.currency {
            return Err(format!(
                "product priced in {}, basket in {}",
                product.price.currency, basket.currency
            ));
        }

        let requested = options.quantity.unwrap_or(self.config.min_quantity);
        if requested < self.config.min_quantity {
            return Err(format!("quantity {requested} below minimum"));
        }

        let selected = selected_options(&options.options, &product.options);
        let existing = basket.find_matching(&product.id, selected);
        let held = existing.map(|e| e.quantity).unwrap_or(0);
        let total = held
            .checked_add(requested)
            .ok_or_else(|| "quantity overflow".to_string())?;
        if total > self.config.max_quantity_per_element {
            return Err(format!(
                "quantity {total} exceeds {}",
                self.config.max_quantity_per_element
            ));
        }
        if !product.inventory.can_fulfill(total) {
            return Err(format!(
                "only {} in stock",
                product.inventory.available().max(0)
            ));
        }

        if existing.is_none() {
            if let Some(max) = self.config.max_distinct_products {
                if basket.len() >= max {
                    return Err(format!("basket already holds {max} products"));
                }
            }
        }
        Ok(())
    }

    /// Why `element` no longer matches the catalog, if it doesn't.
    fn staleness(&self, element: &BasketElement) -> Option<String> {
        if element.delete {
            return Some("marked for deletion".to_string());
        }
        let Some(product_id) = &element.product_id else {
            return Some("no product".to_string());
        };
        let Some(product) = self.catalog.find(product_id) else {
            return Some(format!("product {product_id} no longer exists"));
        };
        if !product.is_enabled() {
            return Some(format!("product is {}", product.status.as_str()));
        }
        if product.is_master() {
            return Some("a variation must be chosen".to_string());
        }
        if !self.config.quantity_in_range(element.quantity) {
            return Some(format!("quantity {} out of range", element.quantity));
        }
        if !product.inventory.can_fulfill(element.quantity) {
            return Some(format!(
                "only {} in stock",
                product.inventory.available().max(0)
            ));
        }
        if product.price.currency != element.base_price.currency {
            return Some("product currency changed".to_string());
        }
        None
    }

    /// Checkout-time form of [`ProductProvider::is_valid_basket_element`].
    pub fn ensure_valid_basket_element(&self, element: &BasketElement) -> Result<(), CommerceError> {
        match self.staleness(element) {
            None => Ok(()),
            Some(reason) => {
                warn!(element = %element.id, %reason, "stale basket element");
                Err(CommerceError::StaleBasketElement {
                    element_id: element.id.to_string(),
                    reason,
                })
            }
        }
    }

    /// First stale element of `basket`, as an error.
    pub fn validate_basket_for_checkout(&self, basket: &Basket) -> Result<(), CommerceError> {
        basket
            .elements()
            .iter()
            .try_for_each(|element| self.ensure_valid_basket_element(element))
    }

    /// Append every problem with `element` to `collector`.
    pub fn validate_into(
        &self,
        collector: &mut dyn ErrorCollector,
        element: &BasketElement,
        basket: &Basket,
    ) {
        if element.quantity < self.config.min_quantity {
            collector.add_violation(
                "quantity",
                format!("must be at least {}", self.config.min_quantity),
            );
        } else if element.quantity > self.config.max_quantity_per_element {
            collector.add_violation(
                "quantity",
                format!("must not exceed {}", self.config.max_quantity_per_element),
            );
        }

        if element.base_price.currency != basket.currency {
            collector.add_violation(
                "price",
                format!(
                    "currency {} does not match basket currency {}",
                    element.base_price.currency, basket.currency
                ),
            );
        }

        let Some(product_id) = &element.product_id else {
            collector.add_violation("product", "no product selected".to_string());
            return;
        };
        let Some(product) = self.catalog.find(product_id) else {
            collector.add_violation("product", "product no longer exists".to_string());
            return;
        };
        if !product.is_enabled() {
            collector.add_violation("product", "product is not available".to_string());
        }
        if product.is_master() {
            collector.add_violation("product", "a variation must be chosen".to_string());
        }
        if element.quantity > 0 && !product.inventory.can_fulfill(element.quantity) {
            collector.add_violation(
                "quantity",
                format!("only {} left in stock", product.inventory.available().max(0)),
            );
        }
    }

    fn default_product(&self) -> Result<Product, CommerceError> {
        let id = self.config.default_product_id.as_ref().ok_or_else(|| {
            CommerceError::InvalidProduct("no product given and no default configured".to_string())
        })?;
        self.catalog
            .find(id)
            .ok_or_else(|| CommerceError::InvalidProduct(format!("default product {id} not found")))
    }
}

impl ProductProvider for BasketProductProvider {
    fn basket_element_manager(&self) -> &dyn BasketElementManager {
        self.element_manager.as_ref()
    }

    fn define_add_basket_form(
        &self,
        product: &Product,
        builder: &mut dyn FormSchemaBuilder,
        options: &BasketOptions,
    ) {
        forms::define_add_basket_form(&self.config, product, builder, options)
    }

    fn define_basket_element_form(
        &self,
        element: &BasketElement,
        builder: &mut dyn FormSchemaBuilder,
        options: &BasketOptions,
    ) {
        forms::define_basket_element_form(&self.config, element, builder, options)
    }

    fn basket_add_product(
        &self,
        basket: &mut Basket,
        product: &Product,
        new_element: BasketElement,
    ) -> Result<AddOutcome, CommerceError> {
        if new_element.product_id.as_ref() != Some(&product.id) {
            return Err(CommerceError::InvalidProduct(format!(
                "element {} was not built for product {}",
                new_element.id, product.id
            )));
        }

        let options = BasketOptions {
            quantity: Some(new_element.quantity),
            options: new_element.options.clone(),
            properties: new_element.properties.clone(),
        };
        if let Err(reason) = self.addability(basket, product, &options) {
            warn!(basket = %basket.id, product = %product.id, %reason, "product not addable");
            return Ok(AddOutcome::Rejected);
        }

        if let Some(id) = self.basket_merge_product(basket, product, &new_element)? {
            return Ok(AddOutcome::Merged(id));
        }

        let id = basket.push_element(new_element);
        self.refresh_prices(basket);
        info!(basket = %basket.id, product = %product.id, element = %id, "basket line added");
        Ok(AddOutcome::Appended(id))
    }

    fn basket_merge_product(
        &self,
        basket: &mut Basket,
        product: &Product,
        new_element: &BasketElement,
    ) -> Result<Option<BasketElementId>, CommerceError> {
        let max = self.config.max_quantity_per_element;
        let Some(existing) = basket.find_matching_mut(&product.id, &new_element.options) else {
            return Ok(None);
        };

        let quantity = existing
            .quantity
            .checked_add(new_element.quantity)
            .ok_or(CommerceError::Overflow)?;
        if quantity > max {
            return Err(CommerceError::QuantityExceedsLimit(quantity, max));
        }

        existing.quantity = quantity;
        existing.properties.extend(
            new_element
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let id = existing.id.clone();

        self.refresh_prices(basket);
        info!(basket = %basket.id, product = %product.id, element = %id, quantity, "basket line merged");
        Ok(Some(id))
    }

    fn is_valid_basket_element(&self, element: &BasketElement) -> bool {
        self.staleness(element).is_none()
    }

    fn basket_calculate_price(&self, basket: &Basket, element: &BasketElement) -> Money {
        let price = self.config.pricing.unit_price(basket, element);
        debug!(
            basket = %basket.id,
            element = %element.id,
            base = %element.base_price,
            price = %price,
            "unit price calculated"
        );
        price
    }

    fn is_addable_to_basket(
        &self,
        basket: &Basket,
        product: &Product,
        options: &BasketOptions,
    ) -> bool {
        match self.addability(basket, product, options) {
            Ok(()) => true,
            Err(reason) => {
                debug!(basket = %basket.id, product = %product.id, %reason, "not addable");
                false
            }
        }
    }

    fn create_basket_element(
        &self,
        product: Option<&Product>,
        options: &BasketOptions,
    ) -> Result<BasketElement, CommerceError> {
        let fallback;
        let product = match product {
            Some(product) => product,
            None => {
                fallback = self.default_product()?;
                &fallback
            }
        };

        let mut element = self.element_manager.create();
        self.build_basket_element(&mut element, Some(product), options)?;
        Ok(element)
    }

    fn build_basket_element(
        &self,
        element: &mut BasketElement,
        product: Option<&Product>,
        options: &BasketOptions,
    ) -> Result<(), CommerceError> {
        let looked_up;
        let product = match product {
            Some(product) => product,
            None => {
                let id = element.product_id.as_ref().ok_or_else(|| {
                    CommerceError::InvalidProduct("element has no product".to_string())
                })?;
                looked_up = self
                    .catalog
                    .find(id)
                    .ok_or_else(|| CommerceError::InvalidProduct(format!("product {id} not found")))?;
                &looked_up
            }
        };

        if let Some(quantity) = options.quantity {
            if quantity < self.config.min_quantity {
                return Err(CommerceError::InvalidQuantity(quantity));
            }
            if quantity > self.config.max_quantity_per_element {
                return Err(CommerceError::QuantityExceedsLimit(
                    quantity,
                    self.config.max_quantity_per_element,
                ));
            }
            element.quantity = quantity;
        } else if element.quantity < self.config.min_quantity {
            element.quantity = self.config.min_quantity;
        }

        element.product_id = Some(product.id.clone());
        element.sku = product.sku.clone();
        element.name = product.name.clone();
        element.base_price = product.price;
        element.unit_price = product.price;
        element.vat_rate = product.vat_rate;

        let current = if element.options.is_empty() {
            &product.options
        } else {
            &element.options
        };
        element.options = selected_options(&options.options, current).clone();
        element.properties.extend(
            options
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(())
    }

    fn validate_form_basket_element(
        &self,
        element: &BasketElement,
        basket: &Basket,
    ) -> Result<BasketElement, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.validate_into(&mut errors, element, basket);
        errors.into_result()?;

        let mut validated = element.clone();
        if let Err(e) = self.build_basket_element(&mut validated, None, &BasketOptions::default()) {
            let mut errors = ValidationErrors::new();
            errors.add_violation("product", e.to_string());
            return Err(errors);
        }

        // Price the copy as it would sit in the basket.
        let mut preview = basket.clone();
        if preview.replace_element(validated.clone()).is_err() {
            preview.push_element(validated.clone());
        }
        validated.unit_price = self.basket_calculate_price(&preview, &validated);
        Ok(validated)
    }

    fn create_variation<'a>(
        &self,
        product: &'a mut Product,
    ) -> Result<&'a mut Product, CommerceError> {
        variation::create_variation(product)
    }

    fn copy_variation(&self, product: &mut Product, scope: CopyScope, force_copy: bool) {
        variation::copy_variation(&self.config, product, scope, force_copy)
    }
}
