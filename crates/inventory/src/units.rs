//! Measurement-unit conversion.
//!
//! Only one unit family is convertible: mass, where 1 kg = 1000 gram. Any
//! other `(from, to)` pair is an identity conversion. Historical data was
//! recorded before stricter unit validation existed, so an unknown pair must
//! pass through unchanged rather than error.
//!
//! Quantity and per-unit money scale reciprocally, keeping the monetary total
//! `quantity × unit_price` invariant under conversion.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{round_money, round_quantity};

pub const KG: &str = "kg";
pub const GRAM: &str = "gram";

const GRAMS_PER_KG: Decimal = Decimal::ONE_THOUSAND;

/// The quantity/price tuple a conversion operates on.
///
/// All monetary fields are **per unit** of `quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitAmounts {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub sale_price: Decimal,
    pub shipping_per_unit: Decimal,
    pub markup: Decimal,
}

impl UnitAmounts {
    /// The monetary total this tuple represents; invariant under conversion.
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Convert a tuple between units. Identity for any non-mass pair.
pub fn convert(amounts: UnitAmounts, from: &str, to: &str) -> UnitAmounts {
    match (from, to) {
        (KG, GRAM) => scale(amounts, GRAMS_PER_KG),
        (GRAM, KG) => scale(amounts, Decimal::ONE / GRAMS_PER_KG),
        _ => amounts,
    }
}

/// Scale quantity up by `factor` and per-unit money down by it.
///
/// Scaled-down money keeps 5 decimal places (a per-gram rate needs the extra
/// precision); scaled-up money is stored money and rounds to 2.
fn scale(amounts: UnitAmounts, factor: Decimal) -> UnitAmounts {
    let money = |value: Decimal| {
        let scaled = value / factor;
        if factor > Decimal::ONE {
            round_quantity(scaled)
        } else {
            round_money(scaled)
        }
    };
    UnitAmounts {
        quantity: round_quantity(amounts.quantity * factor),
        unit_price: money(amounts.unit_price),
        sale_price: money(amounts.sale_price),
        shipping_per_unit: money(amounts.shipping_per_unit),
        markup: money(amounts.markup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn tuple(quantity: Decimal, unit_price: Decimal) -> UnitAmounts {
        UnitAmounts {
            quantity,
            unit_price,
            sale_price: unit_price + dec!(1),
            shipping_per_unit: dec!(0.10),
            markup: dec!(0.50),
        }
    }

    #[test]
    fn kg_to_gram_scales_quantity_up_and_money_down() {
        let out = convert(tuple(dec!(5), dec!(3.00)), KG, GRAM);
        assert_eq!(out.quantity, dec!(5000));
        assert_eq!(out.unit_price, dec!(0.003));
        assert_eq!(out.sale_price, dec!(0.004));
        assert_eq!(out.shipping_per_unit, dec!(0.0001));
        assert_eq!(out.total(), dec!(15.00));
    }

    #[test]
    fn gram_to_kg_scales_quantity_down_and_money_up() {
        // Scenario: 5000 gram at $0.003/gram submitted against a kg-native item.
        let input = UnitAmounts {
            quantity: dec!(5000),
            unit_price: dec!(0.002),
            sale_price: dec!(0.003),
            shipping_per_unit: dec!(0.0001),
            markup: Decimal::ZERO,
        };
        let out = convert(input, GRAM, KG);
        assert_eq!(out.quantity, dec!(5));
        assert_eq!(out.unit_price, dec!(2.00));
        assert_eq!(out.sale_price, dec!(3.00));
        assert_eq!(out.shipping_per_unit, dec!(0.10));
    }

    #[test]
    fn unknown_pairs_are_identity() {
        let input = tuple(dec!(7), dec!(1.25));
        assert_eq!(convert(input, "piece", KG), input);
        assert_eq!(convert(input, KG, "piece"), input);
        assert_eq!(convert(input, "litre", "gallon"), input);
        // Same-unit "conversion" is also a no-op.
        assert_eq!(convert(input, KG, KG), input);
    }

    proptest! {
        // Quantities up to 1000 with 3 decimal places, prices with 2; at
        // these scales the reciprocal rounding is exact, so the round trip
        // and the monetary total are preserved exactly.
        #[test]
        fn round_trip_preserves_tuple(q in 1i64..1_000_000, cents in 0i64..1_000_000) {
            let input = tuple(
                Decimal::new(q, 3),
                Decimal::new(cents, 2),
            );
            let there = convert(input, KG, GRAM);
            let back = convert(there, GRAM, KG);
            prop_assert_eq!(back.quantity, input.quantity.normalize());
            prop_assert_eq!(back.unit_price.normalize(), input.unit_price.normalize());
            prop_assert_eq!(back.sale_price.normalize(), input.sale_price.normalize());
        }

        #[test]
        fn monetary_total_is_invariant(q in 1i64..1_000_000, cents in 0i64..1_000_000) {
            let input = tuple(Decimal::new(q, 3), Decimal::new(cents, 2));
            let converted = convert(input, KG, GRAM);
            prop_assert_eq!(converted.total().normalize(), input.total().normalize());
        }
    }
}
