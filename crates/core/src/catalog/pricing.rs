//! Unit price resolution.
//!
//! Fallback order, first positive value wins:
//! variant sale price, variant price, product sale price, product price.
//! Zero or missing values never win.

use rust_decimal::Decimal;

use super::{Product, Variant};

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| v.is_sign_positive() && !v.is_zero())
}

/// Price a customer pays for one unit of `product` (optionally `variant`).
#[must_use]
pub fn resolve_unit_price(product: &Product, variant: Option<&Variant>) -> Decimal {
    variant
        .and_then(|v| positive(v.sale_price).or_else(|| positive(v.price)))
        .or_else(|| positive(product.sale_price))
        .unwrap_or(product.price)
}

/// The struck-through "was" price, when the resolved price is a sale price.
///
/// Returns `None` when no discount applies.
#[must_use]
pub fn compare_at_price(product: &Product, variant: Option<&Variant>) -> Option<Decimal> {
    let regular = match variant {
        Some(v) if positive(v.sale_price).is_some() => {
            positive(v.price).unwrap_or(product.price)
        }
        Some(v) if positive(v.price).is_some() => return None,
        _ if positive(product.sale_price).is_some() => product.price,
        _ => return None,
    };
    let paid = resolve_unit_price(product, variant);
    (regular > paid).then_some(regular)
}

/// Whole-percent discount of the resolved price against the regular price.
#[must_use]
pub fn discount_percent(product: &Product, variant: Option<&Variant>) -> Option<u32> {
    let regular = compare_at_price(product, variant)?;
    let paid = resolve_unit_price(product, variant);
    let pct = ((regular - paid) / regular * Decimal::ONE_HUNDRED).round();
    u32::try_from(pct).ok().filter(|p| *p > 0)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{dec, product, variant};
    use super::*;

    #[test]
    fn test_product_price_when_nothing_else() {
        let p = product("Falcon", "249.00");
        assert_eq!(resolve_unit_price(&p, None), dec("249.00"));
    }

    #[test]
    fn test_product_sale_price_wins_over_product_price() {
        let mut p = product("Falcon", "249.00");
        p.sale_price = Some(dec("199.00"));
        assert_eq!(resolve_unit_price(&p, None), dec("199.00"));
    }

    #[test]
    fn test_variant_price_wins_over_product_sale_price() {
        let mut p = product("Falcon", "249.00");
        p.sale_price = Some(dec("199.00"));
        let mut v = variant(&p, "128 Go");
        v.price = Some(dec("279.00"));
        assert_eq!(resolve_unit_price(&p, Some(&v)), dec("279.00"));
    }

    #[test]
    fn test_variant_sale_price_wins_over_everything() {
        let mut p = product("Falcon", "249.00");
        p.sale_price = Some(dec("199.00"));
        let mut v = variant(&p, "128 Go");
        v.price = Some(dec("279.00"));
        v.sale_price = Some(dec("229.00"));
        assert_eq!(resolve_unit_price(&p, Some(&v)), dec("229.00"));
    }

    #[test]
    fn test_zero_variant_price_falls_back_to_product_level() {
        let mut p = product("Falcon", "249.00");
        let mut v = variant(&p, "Noir");
        v.price = Some(Decimal::ZERO);
        v.sale_price = None;
        assert_eq!(resolve_unit_price(&p, Some(&v)), dec("249.00"));

        p.sale_price = Some(dec("219.00"));
        assert_eq!(resolve_unit_price(&p, Some(&v)), dec("219.00"));
    }

    #[test]
    fn test_resolution_never_picks_other_values() {
        // Exhaustive over presence/absence of the four candidate prices.
        let prices = [dec("100"), dec("90"), dec("80"), dec("70")];
        for mask in 0u8..16 {
            let mut p = product("Hawk", "100");
            let mut v = variant(&p, "Blanc");
            p.price = prices[0];
            p.sale_price = (mask & 1 != 0).then_some(prices[1]);
            v.price = (mask & 2 != 0).then_some(prices[2]);
            v.sale_price = (mask & 4 != 0).then_some(prices[3]);

            let expected = if mask & 4 != 0 {
                prices[3]
            } else if mask & 2 != 0 {
                prices[2]
            } else if mask & 1 != 0 {
                prices[1]
            } else {
                prices[0]
            };
            assert_eq!(resolve_unit_price(&p, Some(&v)), expected, "mask {mask:04b}");
        }
    }

    #[test]
    fn test_compare_at_and_discount() {
        let mut p = product("Falcon", "250.00");
        assert_eq!(compare_at_price(&p, None), None);
        assert_eq!(discount_percent(&p, None), None);

        p.sale_price = Some(dec("200.00"));
        assert_eq!(compare_at_price(&p, None), Some(dec("250.00")));
        assert_eq!(discount_percent(&p, None), Some(20));

        let mut v = variant(&p, "Rouge");
        v.price = Some(dec("300.00"));
        assert_eq!(compare_at_price(&p, Some(&v)), None);

        v.sale_price = Some(dec("225.00"));
        assert_eq!(compare_at_price(&p, Some(&v)), Some(dec("300.00")));
        assert_eq!(discount_percent(&p, Some(&v)), Some(25));
    }
}
