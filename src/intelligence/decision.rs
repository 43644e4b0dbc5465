// ABOUTME: Deterministic rule set turning a nutrition record into a verdict
// ABOUTME: Base thresholds, fiber downgrade, type adjustment, portion, swaps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use crate::constants::thresholds::{
    FIBER_HELPS, NET_CARBS_LIMIT, NET_CARBS_SAFE, PORTION_MAX_GRAMS, PORTION_MIN_GRAMS,
    SUGARS_AVOID, SUGARS_LIMIT, TARGET_NET_CARBS_PER_SERVING, TYPE2_NET_CARBS_ESCALATE,
    TYPE2_SUGARS_ESCALATE,
};
use crate::models::{Decision, DiabetesType, FoodItem, Suitability};

/// Pure, side-effect-free suitability classifier.
///
/// Rules apply in a fixed order: base category by sugar/net-carb
/// thresholds (first match wins), then the fiber downgrade, then the
/// diabetes-type adjustment. Portion guidance and alternative
/// suggestions depend only on the record and the type.
pub struct DecisionEngine;

impl DecisionEngine {
    /// Classify one nutrition record for one diabetes type
    #[must_use]
    pub fn decide(item: &FoodItem, diabetes_type: DiabetesType) -> Decision {
        let sugars = item.sugars_per_100g.unwrap_or(0.0);
        let fiber = item.fiber_per_100g.unwrap_or(0.0);
        let net = item.net_carbs_per_100g();

        let (mut category, mut reason) = Self::base_category(sugars, net);

        // High fiber softens the verdict one step; SAFE and AVOID are
        // left alone.
        if fiber >= FIBER_HELPS {
            match category {
                Suitability::Limit => {
                    category = Suitability::SmallPortion;
                    reason.push_str(" (High fiber content helps)");
                }
                Suitability::SmallPortion => {
                    category = Suitability::Safe;
                    reason.push_str(" (High fiber content helps)");
                }
                Suitability::Safe | Suitability::Avoid | Suitability::Unknown => {}
            }
        }

        match diabetes_type {
            DiabetesType::Type2 => {
                if category == Suitability::SmallPortion && sugars >= TYPE2_SUGARS_ESCALATE {
                    category = Suitability::Limit;
                    reason = "High sugar content for Type 2 diabetes".to_owned();
                }
                if category == Suitability::SmallPortion && net > TYPE2_NET_CARBS_ESCALATE {
                    category = Suitability::Limit;
                    reason = "High net carbs for Type 2 diabetes".to_owned();
                }
            }
            DiabetesType::Type1 => {
                if category == Suitability::Limit && sugars < SUGARS_LIMIT && fiber >= FIBER_HELPS {
                    category = Suitability::SmallPortion;
                    reason = "Consider carb counting per your care plan".to_owned();
                }
            }
        }

        let portion_grams = Self::portion_grams(net);
        let portion_note = match diabetes_type {
            DiabetesType::Type2 => "Keep portions small; pair with protein/fiber.",
            DiabetesType::Type1 => "Monitor carbs; follow your care plan.",
        };
        let portion_text = format!("{portion_grams}g portion. {portion_note}");

        let alternatives = Self::suggest_alternatives(&item.name.to_lowercase());

        Decision {
            category,
            reason,
            portion_text,
            alternatives,
            source: item.source.to_string(),
            diabetes_type,
        }
    }

    /// Base category by threshold order; first matching rule wins
    fn base_category(sugars: f64, net: f64) -> (Suitability, String) {
        if sugars >= SUGARS_AVOID {
            (
                Suitability::Avoid,
                format!("High sugar content ({sugars}g per 100g)"),
            )
        } else if sugars >= SUGARS_LIMIT || net >= NET_CARBS_LIMIT {
            (
                Suitability::Limit,
                "High sugar or net carb content".to_owned(),
            )
        } else if net <= NET_CARBS_SAFE {
            (
                Suitability::Safe,
                format!("Low net carbs ({net}g per 100g)"),
            )
        } else {
            (
                Suitability::SmallPortion,
                format!("Moderate net carbs ({net}g per 100g)"),
            )
        }
    }

    /// Grams delivering roughly the target net carbs, clamped to a
    /// sensible serving range. Zero net carbs means a free 100g portion.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn portion_grams(net_carbs_per_100g: f64) -> u32 {
        if net_carbs_per_100g <= 0.0 {
            return 100;
        }
        let grams = 100.0 * TARGET_NET_CARBS_PER_SERVING / net_carbs_per_100g;
        grams.clamp(PORTION_MIN_GRAMS, PORTION_MAX_GRAMS) as u32
    }

    /// Keyword-bucket swap suggestions; exactly one bucket, first match
    /// in scan order wins
    fn suggest_alternatives(food_name: &str) -> Vec<String> {
        let has = |needle: &str| food_name.contains(needle);

        let bucket: &[&str] = if has("sugar") || has("sweet") || has("soda") || has("cola") {
            &[
                "unsweetened yogurt",
                "nuts",
                "fruit with peel",
                "water/unsweetened tea",
            ]
        } else if has("rice") {
            &["brown rice", "cauliflower rice", "quinoa"]
        } else if has("roti") || has("naan") {
            &["whole wheat roti", "multigrain roti"]
        } else if has("samosa") || has("fries") || has("chips") || has("pakoda") {
            &["roasted chana", "baked options", "salad"]
        } else {
            &["dal", "grilled fish/chicken", "non-starchy vegetables"]
        };

        bucket.iter().map(|s| (*s).to_owned()).collect()
    }
}
