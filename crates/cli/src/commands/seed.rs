//! Demo catalog.
//!
//! ```bash
//! mtg-cli seed
//! ```
//!
//! Inserts a small connected-eyewear catalog with color and lens variants.
//! Categories and products whose slug already exists are left untouched, so
//! the command can be run again safely.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use mytechgear_admin::db::{
    CategoryRepository, ProductRepository, RepositoryError, VariantRepository,
};
use mytechgear_admin::models::{CategoryInput, ProductInput, VariantInput};
use mytechgear_core::CategoryId;

use super::{CliError, connect};

struct DemoVariant {
    name: &'static str,
    color: &'static str,
    lens: &'static str,
    stock: i32,
    price: Option<Decimal>,
}

struct DemoProduct {
    slug: &'static str,
    name: &'static str,
    category: &'static str,
    short_description: &'static str,
    price: Decimal,
    sale_price: Option<Decimal>,
    tags: &'static [&'static str],
    features: &'static [&'static str],
    specifications: &'static [(&'static str, &'static str)],
    variants: &'static [DemoVariant],
}

const CATEGORIES: &[(&str, &str, &str)] = &[
    (
        "lunettes-audio",
        "Lunettes audio",
        "Open-ear speakers built into the temples.",
    ),
    (
        "lunettes-sport",
        "Lunettes sport",
        "Heads-up metrics for running and cycling.",
    ),
    (
        "accessoires",
        "Accessoires",
        "Cases, chargers and replacement lenses.",
    ),
];

fn demo_products() -> Vec<DemoProduct> {
    vec![
        DemoProduct {
            slug: "falcon",
            name: "Falcon",
            category: "lunettes-audio",
            short_description: "Polarized audio sunglasses with 8 h playback.",
            price: Decimal::new(24900, 2),
            sale_price: None,
            tags: &["audio", "bluetooth", "polarized"],
            features: &["Open-ear speakers", "Touch controls", "IPX4"],
            specifications: &[("battery", "8 h"), ("weight", "42 g"), ("bluetooth", "5.3")],
            variants: const { &[
                DemoVariant { name: "Noir mat / Fumé", color: "Noir mat", lens: "Fumé", stock: 25, price: None },
                DemoVariant { name: "Écaille / Bronze", color: "Écaille", lens: "Bronze", stock: 12, price: None },
                DemoVariant {
                    name: "Noir mat / Photochromique",
                    color: "Noir mat",
                    lens: "Photochromique",
                    stock: 6,
                    price: Some(Decimal::from_parts(27900, 0, 0, false, 2)),
                },
            ] },
        },
        DemoProduct {
            slug: "prism",
            name: "Prism",
            category: "lunettes-audio",
            short_description: "Blue-light filtering frames with voice assistant.",
            price: Decimal::new(19900, 2),
            sale_price: Some(Decimal::new(16900, 2)),
            tags: &["audio", "blue-light"],
            features: &["Voice assistant", "Blue-light filter", "Magnetic charging"],
            specifications: &[("battery", "6 h"), ("weight", "38 g")],
            variants: &[
                DemoVariant { name: "Cristal / Clair", color: "Cristal", lens: "Clair", stock: 30, price: None },
                DemoVariant { name: "Noir / Clair", color: "Noir", lens: "Clair", stock: 0, price: None },
            ],
        },
        DemoProduct {
            slug: "stride",
            name: "Stride",
            category: "lunettes-sport",
            short_description: "Wraparound sport glasses with a heads-up pace display.",
            price: Decimal::new(34900, 2),
            sale_price: None,
            tags: &["sport", "hud"],
            features: &["Heads-up display", "Heart-rate pairing", "Anti-fog coating"],
            specifications: &[("battery", "10 h"), ("weight", "48 g"), ("display", "Micro-OLED")],
            variants: &[
                DemoVariant { name: "Blanc / Miroir bleu", color: "Blanc", lens: "Miroir bleu", stock: 9, price: None },
                DemoVariant { name: "Noir / Miroir rouge", color: "Noir", lens: "Miroir rouge", stock: 4, price: None },
            ],
        },
        DemoProduct {
            slug: "etui-chargeur",
            name: "Étui chargeur",
            category: "accessoires",
            short_description: "Hard case with a built-in 3-charge battery.",
            price: Decimal::new(4900, 2),
            sale_price: None,
            tags: &["accessory"],
            features: &["USB-C", "3 full charges"],
            specifications: &[("capacity", "1200 mAh")],
            variants: &[],
        },
    ]
}

fn product_input(product: &DemoProduct, category_id: Option<CategoryId>) -> ProductInput {
    let stock_quantity = product.variants.iter().map(|v| v.stock).sum();
    ProductInput {
        slug: product.slug.to_string(),
        name: product.name.to_string(),
        description: None,
        short_description: Some(product.short_description.to_string()),
        price: product.price,
        sale_price: product.sale_price,
        stock_quantity: if product.variants.is_empty() { 50 } else { stock_quantity },
        category_id,
        tags: product.tags.iter().map(ToString::to_string).collect(),
        features: product.features.iter().map(ToString::to_string).collect(),
        specifications: product
            .specifications
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
            .collect(),
        is_active: true,
        sort_order: 0,
    }
}

fn variant_input(variant: &DemoVariant, sort_order: i32) -> VariantInput {
    let attributes: BTreeMap<String, Value> = [
        ("color".to_string(), json!(variant.color)),
        ("lens".to_string(), json!(variant.lens)),
    ]
    .into_iter()
    .collect();

    VariantInput {
        name: variant.name.to_string(),
        price: variant.price,
        sale_price: None,
        stock_quantity: variant.stock,
        attributes,
        image_url: None,
        sort_order,
    }
}

async fn seed_categories(pool: &PgPool) -> Result<BTreeMap<&'static str, CategoryId>, CliError> {
    let repo = CategoryRepository::new(pool);

    for (sort_order, (slug, name, description)) in (0..).zip(CATEGORIES) {
        let input = CategoryInput {
            slug: (*slug).to_string(),
            name: (*name).to_string(),
            description: Some((*description).to_string()),
            sort_order,
        };
        input.validate().map_err(CliError::InvalidSeed)?;
        match repo.create(&input).await {
            Ok(_) => tracing::info!(slug, "Category created"),
            Err(RepositoryError::Conflict(_)) => tracing::info!(slug, "Category exists, skipped"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(repo
        .list()
        .await?
        .into_iter()
        .filter_map(|c| {
            CATEGORIES
                .iter()
                .find(|(slug, _, _)| *slug == c.slug)
                .map(|(slug, _, _)| (*slug, c.id))
        })
        .collect())
}

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns `CliError` on database failure. Existing slugs are skipped.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;
    let categories = seed_categories(&pool).await?;

    let products = ProductRepository::new(&pool);
    let variants = VariantRepository::new(&pool);
    let mut created = 0_usize;

    for product in demo_products() {
        let input = product_input(&product, categories.get(product.category).copied());
        input.validate().map_err(CliError::InvalidSeed)?;

        let product_id = match products.create(&input).await {
            Ok(id) => id,
            Err(RepositoryError::Conflict(_)) => {
                tracing::info!(slug = product.slug, "Product exists, skipped");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for (sort_order, variant) in (0..).zip(product.variants) {
            let input = variant_input(variant, sort_order);
            input.validate().map_err(CliError::InvalidSeed)?;
            variants.create(product_id, &input).await?;
        }

        tracing::info!(
            slug = product.slug,
            variants = product.variants.len(),
            "Product created"
        );
        created += 1;
    }

    tracing::info!(created, "Seeding complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_is_valid() {
        for product in demo_products() {
            assert!(
                CATEGORIES.iter().any(|(slug, _, _)| *slug == product.category),
                "{} has an unknown category",
                product.slug
            );
            assert_eq!(product_input(&product, None).validate(), Ok(()));
            for variant in product.variants {
                assert_eq!(variant_input(variant, 0).validate(), Ok(()));
            }
        }
    }

    #[test]
    fn test_product_stock_is_sum_of_variants() {
        let falcon = demo_products()
            .into_iter()
            .find(|p| p.slug == "falcon")
            .unwrap();
        assert_eq!(product_input(&falcon, None).stock_quantity, 43);
        assert_eq!(falcon.price, Decimal::new(24900, 2));
    }
}
