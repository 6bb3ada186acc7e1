//! Price estimation for a moving request.
//!
//! The estimate is midpoint-based: every contribution is summed into a
//! stable center, complexity guards may boost it, and the user-facing range
//! is the center expanded by a symmetric margin. Per-band minimums and the
//! complexity floor are applied last.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::bots::moving::catalog;
use crate::domain::lead::{
    BreakdownEntry, CargoItem, Estimate, PriceBreakdown, RouteBand, RouteClassification,
    VolumeCategory,
};
use crate::domain::session::{ExtraService, Stop};

#[derive(Clone, Debug)]
pub struct PricingSettings {
    pub currency: String,
    pub volume_base_small: i64,
    pub volume_base_medium: i64,
    pub volume_base_large: i64,
    pub volume_base_xl: i64,
    pub per_floor_rate: i64,
    pub fee_movers: i64,
    pub fee_assembly: i64,
    pub fee_packing: i64,
    pub estimate_margin: Decimal,
    pub complex_multiplier: Decimal,
    pub risk_buffer: Decimal,
    pub complex_min_floor: i64,
    /// Item-midpoint-sum thresholds for volume inference.
    pub volume_small_max: i64,
    pub volume_medium_max: i64,
    pub volume_large_max: i64,
    /// This many heavy items pushes the inferred volume to `xl`.
    pub heavy_xl_count: usize,
    /// Cargo longer than this with zero recognised items and no volume
    /// suppresses the user-facing estimate.
    pub suppression_min_cargo_len: usize,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            currency: "ILS".to_string(),
            volume_base_small: 350,
            volume_base_medium: 800,
            volume_base_large: 1600,
            volume_base_xl: 2800,
            per_floor_rate: 60,
            fee_movers: 300,
            fee_assembly: 250,
            fee_packing: 200,
            estimate_margin: Decimal::new(15, 2),
            complex_multiplier: Decimal::new(118, 2),
            risk_buffer: Decimal::new(108, 2),
            complex_min_floor: 7800,
            volume_small_max: 400,
            volume_medium_max: 1200,
            volume_large_max: 2500,
            heavy_xl_count: 2,
            suppression_min_cargo_len: 30,
        }
    }
}

impl PricingSettings {
    pub fn volume_base(&self, category: VolumeCategory) -> i64 {
        match category {
            VolumeCategory::Small => self.volume_base_small,
            VolumeCategory::Medium => self.volume_base_medium,
            VolumeCategory::Large => self.volume_base_large,
            VolumeCategory::Xl => self.volume_base_xl,
        }
    }

    pub fn route_fee(&self, band: RouteBand) -> i64 {
        match band {
            RouteBand::SameCity => 0,
            RouteBand::SameMetro => 150,
            RouteBand::InterRegionShort => 350,
            RouteBand::InterRegionLong => 700,
            RouteBand::CrossCountry => 1200,
        }
    }

    pub fn route_minimum(&self, band: RouteBand) -> i64 {
        match band {
            RouteBand::SameCity => 250,
            RouteBand::SameMetro => 350,
            RouteBand::InterRegionShort => 1200,
            RouteBand::InterRegionLong => 1800,
            RouteBand::CrossCountry => 2600,
        }
    }

    pub fn extra_fee(&self, extra: ExtraService) -> i64 {
        match extra {
            ExtraService::Movers => self.fee_movers,
            ExtraService::Assembly => self.fee_assembly,
            ExtraService::Packing => self.fee_packing,
        }
    }
}

/// Infer the volume category from recognised items: sum of midpoint values
/// against the configured thresholds, with a heavy-count override toward
/// `xl`. `None` when there are no items to infer from.
pub fn infer_volume(items: &[CargoItem], settings: &PricingSettings) -> Option<VolumeCategory> {
    if items.is_empty() {
        return None;
    }

    let heavy_count: usize =
        items.iter().filter(|item| item.heavy).map(|item| item.qty as usize).sum();
    if heavy_count >= settings.heavy_xl_count {
        return Some(VolumeCategory::Xl);
    }

    let midpoint_sum: i64 = items
        .iter()
        .map(|item| (item.price_min + item.price_max) / 2 * i64::from(item.qty))
        .sum();

    Some(if midpoint_sum <= settings.volume_small_max {
        VolumeCategory::Small
    } else if midpoint_sum <= settings.volume_medium_max {
        VolumeCategory::Medium
    } else if midpoint_sum <= settings.volume_large_max {
        VolumeCategory::Large
    } else {
        VolumeCategory::Xl
    })
}

/// The parsing-quality fallback: long cargo text that produced nothing
/// reliable means the range would mislead.
pub fn estimate_is_unreliable(
    cargo_raw: &str,
    items: &[CargoItem],
    volume: Option<VolumeCategory>,
    settings: &PricingSettings,
) -> bool {
    cargo_raw.chars().count() > settings.suppression_min_cargo_len
        && items.is_empty()
        && volume.is_none()
}

pub struct EstimateInput<'a> {
    pub items: &'a [CargoItem],
    pub volume_category: Option<VolumeCategory>,
    pub route: Option<&'a RouteClassification>,
    pub pickups: &'a [Stop],
    pub destination: Option<&'a Stop>,
    pub extras: &'a [ExtraService],
}

fn floor_surcharge(stop: &Stop, per_floor_rate: i64) -> i64 {
    if stop.has_elevator || stop.floor_num <= 1 {
        0
    } else {
        i64::from(stop.floor_num) * per_floor_rate
    }
}

const HIGH_FLOOR_THRESHOLD: i32 = 5;

/// Count of pricing-risk triggers. Used by the complexity guards.
fn complexity_score(input: &EstimateInput<'_>) -> (u8, Vec<String>) {
    let mut triggers = Vec::new();

    if matches!(input.volume_category, Some(VolumeCategory::Large | VolumeCategory::Xl)) {
        triggers.push("large_volume".to_string());
    }
    if input.extras.contains(&ExtraService::Assembly) {
        triggers.push("assembly".to_string());
    }
    if input.pickups.len() >= 2 {
        triggers.push("multi_pickup".to_string());
    }
    if input.route.is_some_and(|route| route.band.is_inter_region()) {
        triggers.push("inter_region".to_string());
    }
    let high_floor_no_elevator = input
        .pickups
        .iter()
        .chain(input.destination)
        .any(|stop| !stop.has_elevator && stop.floor_num >= HIGH_FLOOR_THRESHOLD);
    if high_floor_no_elevator {
        triggers.push("high_floor_no_elevator".to_string());
    }

    (triggers.len() as u8, triggers)
}

/// Compute the `(min, max)` estimate and the operator-side breakdown.
pub fn estimate_price(input: &EstimateInput<'_>, settings: &PricingSettings) -> Estimate {
    let mut entries = Vec::new();
    let mut fixed: i64 = 0;

    if let Some(category) = input.volume_category {
        let base = settings.volume_base(category);
        entries.push(BreakdownEntry {
            label: format!("volume:{}", category.as_str()),
            amount: base,
        });
        fixed += base;
    }

    let mut items_mid = Decimal::ZERO;
    for item in input.items {
        let midpoint = Decimal::from(item.price_min + item.price_max) / Decimal::TWO
            * Decimal::from(item.qty);
        items_mid += midpoint;
        entries.push(BreakdownEntry {
            label: format!("item:{} x{}", item.key, item.qty),
            amount: midpoint.round().to_i64().unwrap_or(0),
        });
    }

    for (index, stop) in input.pickups.iter().enumerate() {
        let surcharge = floor_surcharge(stop, settings.per_floor_rate);
        if surcharge > 0 {
            entries.push(BreakdownEntry {
                label: format!("floor:pickup_{}", index + 1),
                amount: surcharge,
            });
            fixed += surcharge;
        }
    }
    if let Some(destination) = input.destination {
        let surcharge = floor_surcharge(destination, settings.per_floor_rate);
        if surcharge > 0 {
            entries.push(BreakdownEntry {
                label: "floor:destination".to_string(),
                amount: surcharge,
            });
            fixed += surcharge;
        }
    }

    let route_band = input.route.map(|route| route.band);
    if let Some(band) = route_band {
        let fee = settings.route_fee(band);
        if fee > 0 {
            entries.push(BreakdownEntry {
                label: format!("route:{}", band.as_str()),
                amount: fee,
            });
            fixed += fee;
        }
    }

    for extra in input.extras {
        let fee = settings.extra_fee(*extra);
        entries.push(BreakdownEntry { label: format!("extra:{}", extra.as_str()), amount: fee });
        fixed += fee;
    }

    let mut mid = Decimal::from(fixed) + items_mid;

    // Complexity guards. Only large/xl moves are ever boosted.
    let (score, triggers) = complexity_score(input);
    let boostable =
        matches!(input.volume_category, Some(VolumeCategory::Large | VolumeCategory::Xl));
    let complexity_applied = boostable && score >= 2;
    if complexity_applied {
        mid *= settings.complex_multiplier * settings.risk_buffer;
    }

    let one = Decimal::ONE;
    let mut min = (mid * (one - settings.estimate_margin)).floor().to_i64().unwrap_or(0).max(0);
    let mut max = (mid * (one + settings.estimate_margin)).ceil().to_i64().unwrap_or(0);

    let mut minimum_applied = false;
    if let Some(band) = route_band {
        let minimum = settings.route_minimum(band);
        if min < minimum {
            min = minimum;
            minimum_applied = true;
        }
        if max < minimum {
            max = minimum;
        }
    }

    if boostable && score >= 3 && min < settings.complex_min_floor {
        min = settings.complex_min_floor;
        minimum_applied = true;
        if max < min {
            max = min;
        }
    }

    Estimate {
        min,
        max,
        currency: settings.currency.clone(),
        breakdown: PriceBreakdown {
            entries,
            route_band,
            complexity_score: score,
            complexity_triggers: triggers,
            complexity_applied,
            minimum_applied,
        },
        suppressed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::moving::extract::extract_items;
    use crate::domain::lead::RouteBand;

    fn stop(floor: i32, elevator: bool) -> Stop {
        Stop { floor_num: floor, has_elevator: elevator, ..Stop::new("somewhere") }
    }

    fn route(band: RouteBand) -> RouteClassification {
        RouteClassification { band, distance_km: Some(10.0), from_names: None, to_names: None }
    }

    fn settings() -> PricingSettings {
        PricingSettings::default()
    }

    #[test]
    fn volume_inference_uses_midpoint_thresholds() {
        let settings = settings();
        let boxes = extract_items("3 коробки");
        assert_eq!(infer_volume(&boxes, &settings), Some(VolumeCategory::Small));
        let flat = extract_items("диван, шкаф, кровать, стол, холодильник");
        assert!(matches!(
            infer_volume(&flat, &settings),
            Some(VolumeCategory::Medium | VolumeCategory::Large)
        ));
        assert_eq!(infer_volume(&[], &settings), None);
    }

    #[test]
    fn two_heavy_items_force_xl() {
        let settings = settings();
        let items = extract_items("пианино и сейф");
        assert_eq!(infer_volume(&items, &settings), Some(VolumeCategory::Xl));
    }

    #[test]
    fn floor_surcharge_only_without_elevator() {
        let settings = settings();
        assert_eq!(floor_surcharge(&stop(3, true), settings.per_floor_rate), 0);
        assert_eq!(floor_surcharge(&stop(1, false), settings.per_floor_rate), 0);
        assert_eq!(
            floor_surcharge(&stop(3, false), settings.per_floor_rate),
            3 * settings.per_floor_rate
        );
    }

    #[test]
    fn breakdown_enumerates_items_and_fees() {
        let settings = settings();
        let items = extract_items("Холодильник, диван");
        let pickups = [stop(3, false)];
        let route = route(RouteBand::InterRegionShort);
        let destination = stop(2, true);
        let estimate = estimate_price(
            &EstimateInput {
                items: &items,
                volume_category: Some(VolumeCategory::Medium),
                route: Some(&route),
                pickups: &pickups,
                destination: Some(&destination),
                extras: &[],
            },
            &settings,
        );

        let labels: Vec<&str> =
            estimate.breakdown.entries.iter().map(|e| e.label.as_str()).collect();
        assert!(labels.contains(&"item:fridge x1"));
        assert!(labels.contains(&"item:sofa x1"));
        assert!(labels.contains(&"floor:pickup_1"));
        assert!(labels.contains(&"route:inter_region_short"));
        assert!(estimate.min > 0);
        assert!(estimate.max >= estimate.min);
        // Route minimum for a short inter-region hop.
        assert!(estimate.min >= settings.route_minimum(RouteBand::SameMetro));
    }

    #[test]
    fn complexity_multiplier_needs_large_volume_and_two_triggers() {
        let settings = settings();
        let pickups = [stop(2, true), stop(1, true)];
        let base_input = EstimateInput {
            items: &[],
            volume_category: Some(VolumeCategory::Large),
            route: None,
            pickups: &pickups,
            extras: &[ExtraService::Assembly],
            destination: None,
        };
        // large + assembly + multi_pickup → score 3, boosted.
        let boosted = estimate_price(&base_input, &settings);
        assert!(boosted.breakdown.complexity_applied);
        assert!(boosted.breakdown.complexity_score >= 2);

        // Same triggers with a small volume: never boosted.
        let small_input = EstimateInput {
            volume_category: Some(VolumeCategory::Small),
            ..base_input
        };
        let small = estimate_price(&small_input, &settings);
        assert!(!small.breakdown.complexity_applied);
    }

    #[test]
    fn score_three_with_xl_enforces_the_hard_floor() {
        let settings = settings();
        let pickups = [stop(6, false), stop(1, true)];
        let destination = stop(2, true);
        let route = route(RouteBand::SameCity);
        let estimate = estimate_price(
            &EstimateInput {
                items: &[],
                volume_category: Some(VolumeCategory::Xl),
                route: Some(&route),
                pickups: &pickups,
                destination: Some(&destination),
                extras: &[ExtraService::Assembly],
            },
            &settings,
        );
        // xl + assembly + multi_pickup + high floor → score 4.
        assert!(estimate.breakdown.complexity_score >= 3);
        assert!(estimate.min >= settings.complex_min_floor);
        assert!(estimate.max >= estimate.min);
    }

    #[test]
    fn suppression_requires_long_text_no_items_no_volume() {
        let settings = settings();
        let long_text = "перевозим всякое разное добро из гаража и кладовки";
        assert!(estimate_is_unreliable(long_text, &[], None, &settings));
        assert!(!estimate_is_unreliable("пара сумок", &[], None, &settings));
        let items = extract_items("диван");
        assert!(!estimate_is_unreliable(long_text, &items, None, &settings));
        assert!(!estimate_is_unreliable(long_text, &[], Some(VolumeCategory::Small), &settings));
    }
}
