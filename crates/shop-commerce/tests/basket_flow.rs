//! End-to-end basket flows through the public API.

use std::sync::Arc;

use shop_commerce::prelude::*;

fn eur(cents: i64) -> Money {
    Money::new(cents, Currency::EUR)
}

fn provider_with(config: EngineConfig, products: &[Product]) -> (BasketProductProvider, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(InMemoryCatalog::new());
    for product in products {
        catalog.insert(product.clone());
    }
    (BasketProductProvider::new(config, catalog.clone()), catalog)
}

fn add(
    provider: &BasketProductProvider,
    basket: &mut Basket,
    product: &Product,
    options: &BasketOptions,
) -> AddOutcome {
    let element = provider
        .create_basket_element(Some(product), options)
        .expect("element builds");
    provider
        .basket_add_product(basket, product, element)
        .expect("add succeeds")
}

#[test]
fn first_add_creates_single_line() {
    let product = Product::new("P1", "Product 1", eur(1000)).with_id("1");
    let (provider, _) = provider_with(EngineConfig::default(), &[product.clone()]);
    let mut basket = Basket::new("session", Currency::EUR);

    let outcome = add(&provider, &mut basket, &product, &BasketOptions::default());

    assert!(matches!(outcome, AddOutcome::Appended(_)));
    assert_eq!(basket.len(), 1);
    let line = &basket.elements()[0];
    assert_eq!(line.product_id, Some(ProductId::new("1")));
    assert_eq!(line.quantity, 1);
    assert_eq!(line.unit_price, eur(1000));
    assert_eq!(basket.total().unwrap(), eur(1000));
}

#[test]
fn second_add_merges_quantities() {
    let product = Product::new("P1", "Product 1", eur(1000)).with_id("1");
    let (provider, _) = provider_with(EngineConfig::default(), &[product.clone()]);
    let mut basket = Basket::new("session", Currency::EUR);

    add(&provider, &mut basket, &product, &BasketOptions::default());
    let outcome = add(&provider, &mut basket, &product, &BasketOptions::default());

    assert!(matches!(outcome, AddOutcome::Merged(_)));
    assert_eq!(basket.len(), 1);
    assert_eq!(basket.elements()[0].quantity, 2);
    assert_eq!(basket.item_count(), 2);
    assert_eq!(basket.total().unwrap(), eur(2000));
}

#[test]
fn unaddable_product_leaves_basket_unchanged() {
    let on_sale = Product::new("P1", "Product 1", eur(1000));
    let mut retired = Product::new("P2", "Product 2", eur(500));
    retired.status = ProductStatus::Archived;
    let (provider, _) = provider_with(EngineConfig::default(), &[on_sale.clone(), retired.clone()]);
    let mut basket = Basket::new("session", Currency::EUR);
    add(&provider, &mut basket, &on_sale, &BasketOptions::default());

    assert!(!provider.is_addable_to_basket(&basket, &retired, &BasketOptions::default()));
    let outcome = add(&provider, &mut basket, &retired, &BasketOptions::default());

    assert!(outcome.is_rejected());
    assert_eq!(basket.len(), 1);
}

#[test]
fn build_basket_element_is_idempotent() {
    let product = Product::new("P1", "Product 1", eur(1000));
    let (provider, _) = provider_with(EngineConfig::default(), &[product.clone()]);
    let options = BasketOptions::quantity(3).with_option("color", "red");

    let mut element = provider.basket_element_manager().create();
    element.position = 7;
    let id = element.id.clone();

    provider
        .build_basket_element(&mut element, Some(&product), &options)
        .unwrap();
    let once = element.clone();
    provider
        .build_basket_element(&mut element, Some(&product), &options)
        .unwrap();

    assert_eq!(element, once);
    assert_eq!(element.id, id);
    assert_eq!(element.position, 7);
}

#[test]
fn price_calculation_is_deterministic() {
    let phone = Product::new("PH", "Phone", eur(49900)).with_id("phone");
    let case = Product::new("CS", "Case", eur(1999)).with_id("case");
    let config = EngineConfig {
        pricing: PricingRules {
            volume_tiers: vec![VolumeTier {
                min_quantity: 2,
                percent_off: 10.0,
            }],
            bundles: vec![BundleRule {
                product_id: ProductId::new("case"),
                with_product_id: ProductId::new("phone"),
                percent_off: 15.0,
            }],
        },
        ..EngineConfig::default()
    };
    let (provider, _) = provider_with(config, &[phone.clone(), case.clone()]);
    let mut basket = Basket::new("session", Currency::EUR);
    add(&provider, &mut basket, &phone, &BasketOptions::default());
    add(&provider, &mut basket, &case, &BasketOptions::quantity(2));

    let case_line = basket.elements()[1].clone();
    let first = provider.basket_calculate_price(&basket, &case_line);
    let second = provider.basket_calculate_price(&basket, &case_line);

    assert_eq!(first, second);
    // 1999 -10% = 1799, then -15% = 1529
    assert_eq!(first, eur(1529));
    assert_eq!(case_line.unit_price, first);

    let pricing = basket.pricing().unwrap();
    assert!(pricing.has_discounts());
    assert_eq!(pricing.grand_total, basket.total().unwrap());
}

#[test]
fn category_copy_honours_force_flag() {
    let mut parent = Product::new("TS", "T-Shirt", eur(1500)).with_type(ProductType::Variable);
    parent.add_category(CategoryId::new("apparel"), true);
    let (provider, _) = provider_with(EngineConfig::default(), &[]);

    provider.create_variation(&mut parent).unwrap().categories.clear();
    provider.create_variation(&mut parent).unwrap().categories =
        vec![ProductCategory {
            category_id: CategoryId::new("sale"),
            main: true,
            enabled: true,
        }];

    provider.copy_product_categories_variation(&mut parent, false);
    assert_eq!(parent.variations[0].categories, parent.categories);
    assert_eq!(
        parent.variations[1].categories[0].category_id,
        CategoryId::new("sale")
    );

    provider.copy_product_categories_variation(&mut parent, true);
    assert!(parent
        .variations
        .iter()
        .all(|v| v.categories == parent.categories));
}

#[test]
fn full_copy_updates_every_slice() {
    let mut parent = Product::new("TS", "T-Shirt", eur(1500)).with_type(ProductType::Variable);
    let (provider, _) = provider_with(EngineConfig::default(), &[]);
    provider.create_variation(&mut parent).unwrap();

    parent.description = Some("Now in organic cotton".into());
    parent.add_delivery(ProductDelivery::new("ups", "FR"));
    parent.add_category(CategoryId::new("apparel"), true);
    parent.add_image("front.png");

    provider.copy_variation(&mut parent, CopyScope::All, true);

    let variation = &parent.variations[0];
    assert_eq!(variation.name, "T-Shirt");
    assert_eq!(variation.description.as_deref(), Some("Now in organic cotton"));
    assert_eq!(variation.deliveries, parent.deliveries);
    assert_eq!(variation.categories, parent.categories);
    assert_eq!(variation.images.len(), 1);
    assert_eq!(variation.images[0].product_id, variation.id);
}

#[test]
fn variation_of_simple_product_fails() {
    let mut product = Product::new("A", "A", eur(100));
    let (provider, _) = provider_with(EngineConfig::default(), &[]);

    assert!(matches!(
        provider.create_variation(&mut product),
        Err(CommerceError::NotVariableProduct(_))
    ));
    assert!(product.variations.is_empty());
}

#[test]
fn archived_product_makes_line_stale() {
    let product = Product::new("A", "A", eur(100));
    let (provider, catalog) = provider_with(EngineConfig::default(), &[product.clone()]);
    let mut basket = Basket::new("session", Currency::EUR);
    add(&provider, &mut basket, &product, &BasketOptions::default());
    assert!(provider.validate_basket_for_checkout(&basket).is_ok());

    let mut archived = product.clone();
    archived.status = ProductStatus::Archived;
    catalog.insert(archived);

    assert!(!provider.is_valid_basket_element(&basket.elements()[0]));
    let err = provider.validate_basket_for_checkout(&basket).unwrap_err();
    assert!(err.is_user_correctable());
}

#[test]
fn edit_form_validation_does_not_touch_basket() {
    let product = Product::new("A", "A", eur(100)).with_inventory(InventoryLevel::new(3));
    let (provider, _) = provider_with(EngineConfig::default(), &[product.clone()]);
    let mut basket = Basket::new("session", Currency::EUR);
    add(&provider, &mut basket, &product, &BasketOptions::default());
    let snapshot = basket.clone();

    let mut edited = basket.elements()[0].clone();
    edited.quantity = 10;
    assert!(provider
        .validate_form_basket_element(&edited, &basket)
        .is_err());
    assert_eq!(basket, snapshot);

    let mut schema = FormSchema::new();
    provider.define_basket_element_form(&basket.elements()[0], &mut schema, &BasketOptions::default());
    assert!(schema.get("quantity").is_some());
}

#[test]
fn distinct_product_cap_is_enforced() {
    let config = EngineConfig {
        max_distinct_products: Some(2),
        ..EngineConfig::default()
    };
    let products: Vec<Product> = (1..=3)
        .map(|n| Product::new(format!("P{n}"), format!("Product {n}"), eur(100)))
        .collect();
    let (provider, _) = provider_with(config, &products);
    let mut basket = Basket::new("session", Currency::EUR);

    add(&provider, &mut basket, &products[0], &BasketOptions::default());
    add(&provider, &mut basket, &products[1], &BasketOptions::default());
    let third = add(&provider, &mut basket, &products[2], &BasketOptions::default());

    assert!(third.is_rejected());
    assert_eq!(basket.len(), 2);
}

#[test]
fn config_drives_engine() {
    let config = EngineConfig::from_toml(
        r#"
        currency = "GBP"
        max_quantity_per_element = 5
        "#,
    )
    .unwrap();
    let product = Product::new("A", "A", Money::new(250, Currency::GBP));
    let (provider, _) = provider_with(config, &[product.clone()]);
    let mut basket = Basket::new("session", Currency::GBP);

    assert!(provider.is_addable_to_basket(&basket, &product, &BasketOptions::quantity(5)));
    assert!(!provider.is_addable_to_basket(&basket, &product, &BasketOptions::quantity(6)));

    add(&provider, &mut basket, &product, &BasketOptions::quantity(5));
    assert_eq!(basket.elements()[0].unit_price.currency, Currency::GBP);
}
