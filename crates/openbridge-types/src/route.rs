//! Route table entries and per-transfer route selections.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{BridgeError, Direction, Result, constants};

/// A named strategy for executing a transfer, carrying a bounded fee rate.
///
/// Routes are configuration, not per-transfer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    /// Lowest fee rate this route charges, as a fraction of the amount.
    pub min_fee_rate: Decimal,
    /// Highest fee rate this route charges.
    pub max_fee_rate: Decimal,
    /// Relative share of `SourceToDest` traffic.
    pub selection_weight: Decimal,
    /// Relative share of `DestToSource` traffic. Falls back to
    /// `selection_weight` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_selection_weight: Option<Decimal>,
}

impl Route {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        min_fee_rate: Decimal,
        max_fee_rate: Decimal,
        selection_weight: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            min_fee_rate,
            max_fee_rate,
            selection_weight,
            reverse_selection_weight: None,
        }
    }

    #[must_use]
    pub fn with_reverse_weight(mut self, weight: Decimal) -> Self {
        self.reverse_selection_weight = Some(weight);
        self
    }

    /// Selection weight for traffic in `direction`.
    #[must_use]
    pub fn weight_for(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::SourceToDest => self.selection_weight,
            Direction::DestToSource => self
                .reverse_selection_weight
                .unwrap_or(self.selection_weight),
        }
    }

    /// Weight for `direction` in sampling units, [`constants::WEIGHT_SCALE`]
    /// per unit of weight. `None` if negative or too large for a `u64`.
    #[must_use]
    pub fn scaled_weight(&self, direction: Direction) -> Option<u64> {
        self.weight_for(direction)
            .checked_mul(Decimal::from(constants::WEIGHT_SCALE))?
            .trunc()
            .to_u64()
    }

    /// Largest fee this route may charge on `amount`.
    #[must_use]
    pub fn max_fee(&self, amount: Decimal) -> Decimal {
        amount * self.max_fee_rate
    }

    /// The default route table: direct bridge, DEX swap, multi-hop.
    #[must_use]
    pub fn default_table() -> Vec<Self> {
        vec![
            Self::new(
                "direct-bridge",
                Decimal::new(1, 2),
                Decimal::new(3, 2),
                Decimal::new(4, 1),
            )
            .with_reverse_weight(Decimal::new(3, 1)),
            Self::new(
                "dex-swap",
                Decimal::new(2, 2),
                Decimal::new(5, 2),
                Decimal::new(4, 1),
            )
            .with_reverse_weight(Decimal::new(5, 1)),
            Self::new(
                "multi-hop",
                Decimal::new(1, 2),
                Decimal::new(5, 2),
                Decimal::new(2, 1),
            ),
        ]
    }
}

/// Sampling weights of `routes` for `direction`.
///
/// # Errors
/// [`BridgeError::FatalConfig`] if a weight does not scale into a `u64`, a
/// positive weight scales to zero, or the weights sum past `u64::MAX`.
pub fn scaled_weights(routes: &[Route], direction: Direction) -> Result<Vec<u64>> {
    let mut total = 0_u64;
    routes
        .iter()
        .map(|route| {
            let weight = route.weight_for(direction);
            let scaled = route.scaled_weight(direction).ok_or_else(|| {
                BridgeError::FatalConfig(format!(
                    "route '{}': {direction} weight {weight} is out of range",
                    route.name
                ))
            })?;
            if scaled == 0 && weight > Decimal::ZERO {
                return Err(BridgeError::FatalConfig(format!(
                    "route '{}': {direction} weight {weight} is below 1/{}",
                    route.name,
                    constants::WEIGHT_SCALE
                )));
            }
            total = total.checked_add(scaled).ok_or_else(|| {
                BridgeError::FatalConfig(format!("{direction} route weights overflow"))
            })?;
            Ok(scaled)
        })
        .collect()
}

/// The route, fee and net amount fixed on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSelection {
    pub route: String,
    pub fee_rate: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    /// The route's ceiling at selection time, kept so the fee bound can be
    /// audited without the configuration.
    pub max_fee_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_weight_falls_back_to_forward() {
        let route = Route::new("r", Decimal::ZERO, Decimal::ONE, Decimal::new(3, 0));
        assert_eq!(route.weight_for(Direction::DestToSource), Decimal::new(3, 0));
        let route = route.with_reverse_weight(Decimal::new(7, 0));
        assert_eq!(route.weight_for(Direction::DestToSource), Decimal::new(7, 0));
        assert_eq!(route.weight_for(Direction::SourceToDest), Decimal::new(3, 0));
    }

    #[test]
    fn default_table_fee_bounds_stay_within_one_to_five_percent() {
        for route in Route::default_table() {
            assert!(route.min_fee_rate >= Decimal::new(1, 2));
            assert!(route.max_fee_rate <= Decimal::new(5, 2));
            assert!(route.min_fee_rate <= route.max_fee_rate);
        }
    }

    #[test]
    fn max_fee_scales_with_amount() {
        let route = Route::new("r", Decimal::new(1, 2), Decimal::new(5, 2), Decimal::ONE);
        assert_eq!(route.max_fee(Decimal::new(1000, 0)), Decimal::new(50, 0));
    }

    #[test]
    fn weights_scale_into_sampling_units() {
        let routes = vec![
            Route::new("a", Decimal::ZERO, Decimal::ONE, Decimal::new(25, 2)),
            Route::new("b", Decimal::ZERO, Decimal::ONE, Decimal::ZERO)
                .with_reverse_weight(Decimal::new(2, 0)),
        ];
        assert_eq!(
            scaled_weights(&routes, Direction::SourceToDest).unwrap(),
            vec![250_000, 0]
        );
        assert_eq!(
            scaled_weights(&routes, Direction::DestToSource).unwrap(),
            vec![250_000, 2_000_000]
        );
    }

    #[test]
    fn unrepresentable_weights_are_refused() {
        let huge = Route::new(
            "huge",
            Decimal::ZERO,
            Decimal::ONE,
            Decimal::from_i128_with_scale(10_i128.pow(24), 0),
        );
        assert_eq!(huge.scaled_weight(Direction::SourceToDest), None);
        assert!(scaled_weights(&[huge], Direction::SourceToDest).is_err());

        let heavy = Route::new(
            "heavy",
            Decimal::ZERO,
            Decimal::ONE,
            Decimal::from(20_000_000_000_000_u64),
        );
        assert!(scaled_weights(&[heavy], Direction::SourceToDest).is_err());

        let tiny = Route::new("tiny", Decimal::ZERO, Decimal::ONE, Decimal::new(1, 7));
        let msg = scaled_weights(&[tiny], Direction::SourceToDest)
            .unwrap_err()
            .to_string();
        assert!(msg.contains("tiny"), "{msg}");

        let half = Decimal::from(10_000_000_000_000_u64);
        let pair = vec![
            Route::new("x", Decimal::ZERO, Decimal::ONE, half),
            Route::new("y", Decimal::ZERO, Decimal::ONE, half),
        ];
        let msg = scaled_weights(&pair, Direction::SourceToDest)
            .unwrap_err()
            .to_string();
        assert!(msg.contains("overflow"), "{msg}");
    }

    #[test]
    fn route_without_reverse_weight_omits_field() {
        let route = Route::new("r", Decimal::ZERO, Decimal::ONE, Decimal::ONE);
        let json = serde_json::to_string(&route).unwrap();
        assert!(!json.contains("reverse_selection_weight"));
        let back: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);
    }
}
