//! Route and fee selection.
//!
//! A route is drawn at random in proportion to its selection weight for the
//! transfer's direction. The fee rate is then drawn uniformly from the
//! route's `[min_fee_rate, max_fee_rate]` on a fixed grid, and the fee is
//! truncated toward zero so it can never exceed `amount * max_fee_rate`.
//!
//! When every weight for a direction is zero the optimizer stops gambling
//! and picks the cheapest route at its minimum rate.

use openbridge_types::{
    BridgeError, Direction, RequestId, Result, Route, RouteSelection, constants, scaled_weights,
};
use parking_lot::Mutex;
use rand::{
    Rng, SeedableRng,
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Weighted-random route selector.
pub struct RouteOptimizer {
    routes: Vec<Route>,
    rng: Mutex<StdRng>,
}

impl RouteOptimizer {
    /// Optimizer seeded from OS entropy.
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Optimizer with a fixed seed, for reproducible selections.
    #[must_use]
    pub fn with_seed(routes: Vec<Route>, seed: u64) -> Self {
        Self {
            routes,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Choose a route for `amount` moving in `direction` and price it.
    ///
    /// # Errors
    /// Returns [`BridgeError::NoRouteAvailable`] if the route table is empty,
    /// [`BridgeError::FatalConfig`] if its weights cannot be sampled.
    pub fn select(
        &self,
        request_id: &RequestId,
        direction: Direction,
        amount: Decimal,
    ) -> Result<RouteSelection> {
        if self.routes.is_empty() {
            return Err(BridgeError::NoRouteAvailable {
                request_id: request_id.to_string(),
            });
        }

        let weights = scaled_weights(&self.routes, direction)?;

        let mut rng = self.rng.lock();
        let selection = match WeightedIndex::new(&weights) {
            Ok(dist) => {
                let route = &self.routes[dist.sample(&mut *rng)];
                let step = rng.gen_range(0..=constants::FEE_RATE_STEPS);
                let span = route.max_fee_rate - route.min_fee_rate;
                let fee_rate = route.min_fee_rate
                    + span * Decimal::from(step) / Decimal::from(constants::FEE_RATE_STEPS);
                price(route, fee_rate, amount)
            }
            Err(_) => {
                let route = self.cheapest();
                tracing::debug!(
                    request_id = %request_id,
                    route = %route.name,
                    %direction,
                    "all route weights zero, using cheapest route"
                );
                price(route, route.min_fee_rate, amount)
            }
        };
        drop(rng);

        tracing::info!(
            request_id = %request_id,
            route = %selection.route,
            fee_rate = %selection.fee_rate,
            fee = %selection.fee,
            net_amount = %selection.net_amount,
            "route selected"
        );
        Ok(selection)
    }

    /// Lowest `min_fee_rate`, then lowest `max_fee_rate`, then name.
    fn cheapest(&self) -> &Route {
        let mut best = &self.routes[0];
        for route in &self.routes[1..] {
            let key = (route.min_fee_rate, route.max_fee_rate, &route.name);
            if key < (best.min_fee_rate, best.max_fee_rate, &best.name) {
                best = route;
            }
        }
        best
    }
}

fn price(route: &Route, fee_rate: Decimal, amount: Decimal) -> RouteSelection {
    let fee = (amount * fee_rate)
        .round_dp_with_strategy(constants::AMOUNT_PRECISION, RoundingStrategy::ToZero);
    RouteSelection {
        route: route.name.clone(),
        fee_rate,
        fee,
        net_amount: amount - fee,
        max_fee_rate: route.max_fee_rate,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn id() -> RequestId {
        RequestId::parse("route-test").unwrap()
    }

    fn dec(n: i64, scale: u32) -> Decimal {
        Decimal::new(n, scale)
    }

    #[test]
    fn fee_stays_within_route_bounds() {
        let optimizer = RouteOptimizer::with_seed(Route::default_table(), 7);
        let amount = dec(1000, 0);
        for _ in 0..500 {
            let s = optimizer
                .select(&id(), Direction::SourceToDest, amount)
                .unwrap();
            let route = optimizer
                .routes()
                .iter()
                .find(|r| r.name == s.route)
                .unwrap();
            assert!(s.fee_rate >= route.min_fee_rate && s.fee_rate <= route.max_fee_rate);
            assert!(s.fee >= Decimal::ZERO);
            assert!(s.fee <= amount * route.max_fee_rate);
            assert_eq!(s.net_amount, amount - s.fee);
            assert!(s.fee >= dec(10, 0) && s.fee <= dec(50, 0));
        }
    }

    #[test]
    fn fee_is_truncated_to_eight_places() {
        let route = Route::new("r", dec(1, 2), dec(1, 2), Decimal::ONE);
        let s = price(&route, dec(333_333_333, 10), dec(1, 8));
        assert_eq!(s.fee, Decimal::ZERO);
        assert_eq!(s.net_amount, dec(1, 8));

        let s = price(&route, dec(3, 2), dec(123_456_789, 8));
        // 1.23456789 * 0.03 = 0.0370370367 -> 0.03703703
        assert_eq!(s.fee, dec(3_703_703, 8));
    }

    #[test]
    fn same_seed_same_selections() {
        let a = RouteOptimizer::with_seed(Route::default_table(), 42);
        let b = RouteOptimizer::with_seed(Route::default_table(), 42);
        for _ in 0..20 {
            let sa = a.select(&id(), Direction::DestToSource, dec(500, 0)).unwrap();
            let sb = b.select(&id(), Direction::DestToSource, dec(500, 0)).unwrap();
            assert_eq!(sa, sb);
        }
    }

    #[test]
    fn selection_follows_weights() {
        let optimizer = RouteOptimizer::with_seed(Route::default_table(), 1);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..10_000 {
            let s = optimizer
                .select(&id(), Direction::SourceToDest, dec(100, 0))
                .unwrap();
            *counts.entry(s.route).or_default() += 1;
        }
        let direct = counts["direct-bridge"];
        let dex = counts["dex-swap"];
        let hop = counts["multi-hop"];
        assert!((3_600..=4_400).contains(&direct), "{counts:?}");
        assert!((3_600..=4_400).contains(&dex), "{counts:?}");
        assert!((1_600..=2_400).contains(&hop), "{counts:?}");
    }

    #[test]
    fn heavy_weight_dominates_selection() {
        let routes = vec![
            Route::new("heavy", dec(1, 2), dec(2, 2), Decimal::from(10_000_000_000_000_u64)),
            Route::new("light", dec(1, 2), dec(2, 2), Decimal::ONE),
        ];
        let optimizer = RouteOptimizer::with_seed(routes, 5);
        for _ in 0..1_000 {
            let s = optimizer
                .select(&id(), Direction::SourceToDest, dec(100, 0))
                .unwrap();
            assert_eq!(s.route, "heavy");
        }
    }

    #[test]
    fn unsampleable_weight_is_an_error() {
        let routes = vec![
            Route::new(
                "huge",
                dec(1, 2),
                dec(2, 2),
                Decimal::from_i128_with_scale(10_i128.pow(24), 0),
            ),
            Route::new("light", dec(1, 2), dec(2, 2), Decimal::ONE),
        ];
        let optimizer = RouteOptimizer::with_seed(routes, 5);
        let err = optimizer
            .select(&id(), Direction::SourceToDest, dec(100, 0))
            .unwrap_err();
        assert!(matches!(err, BridgeError::FatalConfig(_)));
    }

    #[test]
    fn reverse_direction_uses_reverse_weights() {
        let routes = vec![
            Route::new("forward-only", dec(1, 2), dec(2, 2), Decimal::ONE)
                .with_reverse_weight(Decimal::ZERO),
            Route::new("reverse-only", dec(1, 2), dec(2, 2), Decimal::ZERO)
                .with_reverse_weight(Decimal::ONE),
        ];
        let optimizer = RouteOptimizer::with_seed(routes, 3);
        for _ in 0..50 {
            let fwd = optimizer
                .select(&id(), Direction::SourceToDest, dec(10, 0))
                .unwrap();
            assert_eq!(fwd.route, "forward-only");
            let rev = optimizer
                .select(&id(), Direction::DestToSource, dec(10, 0))
                .unwrap();
            assert_eq!(rev.route, "reverse-only");
        }
    }

    #[test]
    fn all_zero_weights_fall_back_to_cheapest() {
        let routes = vec![
            Route::new("b-route", dec(2, 2), dec(3, 2), Decimal::ZERO),
            Route::new("a-route", dec(1, 2), dec(4, 2), Decimal::ZERO),
            Route::new("c-route", dec(1, 2), dec(2, 2), Decimal::ZERO),
        ];
        let optimizer = RouteOptimizer::new(routes);
        let s = optimizer
            .select(&id(), Direction::SourceToDest, dec(1000, 0))
            .unwrap();
        assert_eq!(s.route, "c-route");
        assert_eq!(s.fee_rate, dec(1, 2));
        assert_eq!(s.fee, dec(10, 0));
        assert_eq!(s.net_amount, dec(990, 0));
    }

    #[test]
    fn cheapest_breaks_ties_by_name() {
        let routes = vec![
            Route::new("zeta", dec(1, 2), dec(2, 2), Decimal::ZERO),
            Route::new("alpha", dec(1, 2), dec(2, 2), Decimal::ZERO),
        ];
        let optimizer = RouteOptimizer::new(routes);
        let s = optimizer
            .select(&id(), Direction::DestToSource, dec(1, 0))
            .unwrap();
        assert_eq!(s.route, "alpha");
    }

    #[test]
    fn empty_table_has_no_route() {
        let optimizer = RouteOptimizer::new(Vec::new());
        let err = optimizer
            .select(&id(), Direction::SourceToDest, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, BridgeError::NoRouteAvailable { .. }));
    }
}
