//! Form descriptions for adding products and editing basket lines.

use std::collections::BTreeSet;

use crate::basket::BasketElement;
use crate::catalog::Product;
use crate::config::EngineConfig;
use crate::form::{FieldKind, FormField, FormSchemaBuilder};
use crate::provider::BasketOptions;

/// Upper quantity bound a form should offer for `product`.
fn max_quantity(config: &EngineConfig, product: &Product) -> i64 {
    let inventory = &product.inventory;
    if inventory.track_inventory && !inventory.allow_backorder {
        config
            .max_quantity_per_element
            .min(inventory.available().max(0))
    } else {
        config.max_quantity_per_element
    }
}

pub(crate) fn define_add_basket_form(
    config: &EngineConfig,
    product: &Product,
    builder: &mut dyn FormSchemaBuilder,
    options: &BasketOptions,
) {
    builder.add(
        FormField::new("product_id", FieldKind::Hidden)
            .required()
            .default_value(product.id.as_str()),
    );

    let quantity = options.quantity.unwrap_or(config.min_quantity);
    builder.add(
        FormField::new("quantity", FieldKind::Integer)
            .required()
            .range(config.min_quantity, max_quantity(config, product))
            .default_value(quantity.to_string()),
    );

    // One choice per option the product exposes, offering every value its
    // variations use.
    for (name, default) in &product.options {
        let mut choices: BTreeSet<String> = product
            .variations
            .iter()
            .filter(|v| v.is_enabled())
            .filter_map(|v| v.options.get(name).cloned())
            .collect();
        choices.insert(default.clone());

        let selected = options.options.get(name).unwrap_or(default);
        builder.add(
            FormField::new(format!("options.{name}"), FieldKind::Choice)
                .required()
                .choices(choices.into_iter().collect())
                .default_value(selected.clone()),
        );
    }
}

pub(crate) fn define_basket_element_form(
    config: &EngineConfig,
    element: &BasketElement,
    builder: &mut dyn FormSchemaBuilder,
    options: &BasketOptions,
) {
    builder.add(
        FormField::new("element_id", FieldKind::Hidden)
            .required()
            .default_value(element.id.as_str()),
    );

    let quantity = options.quantity.unwrap_or(element.quantity);
    builder.add(
        FormField::new("quantity", FieldKind::Integer)
            .required()
            .range(config.min_quantity, config.max_quantity_per_element)
            .default_value(quantity.to_string()),
    );
    builder.add(FormField::new("delete", FieldKind::Checkbox).default_value("false"));

    for (name, value) in &element.properties {
        builder.add(
            FormField::new(format!("properties.{name}"), FieldKind::Text).default_value(value.clone()),
        );
    }
}
