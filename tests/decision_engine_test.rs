// ABOUTME: Decision engine tests - thresholds, fiber downgrade, type adjustments
// ABOUTME: Portion sizing and alternative-bucket selection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

use carbsense::intelligence::DecisionEngine;
use carbsense::models::{DiabetesType, FoodItem, FoodSource, Suitability};

fn item(name: &str, carbs: f64, sugars: f64, fiber: f64) -> FoodItem {
    FoodItem {
        carbs_per_100g: Some(carbs),
        sugars_per_100g: Some(sugars),
        fiber_per_100g: Some(fiber),
        ..FoodItem::named(name, FoodSource::Off)
    }
}

#[test]
fn net_carbs_floor_at_zero() {
    let food = item("chia seeds", 5.0, 0.0, 30.0);
    assert!((food.net_carbs_per_100g() - 0.0).abs() < f64::EPSILON);
}

#[test]
fn missing_nutrition_counts_as_zero() {
    let food = FoodItem::named("mystery", FoodSource::Off);
    assert!((food.net_carbs_per_100g() - 0.0).abs() < f64::EPSILON);
    let decision = DecisionEngine::decide(&food, DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Safe);
}

#[test]
fn very_high_sugar_is_avoid() {
    let decision = DecisionEngine::decide(&item("jalebi", 60.0, 25.0, 0.0), DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Avoid);
    assert_eq!(decision.reason, "High sugar content (25g per 100g)");
}

#[test]
fn low_net_carbs_is_safe() {
    let decision = DecisionEngine::decide(&item("paneer", 3.0, 10.0, 0.0), DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Safe);
    assert_eq!(decision.reason, "Low net carbs (3g per 100g)");
}

#[test]
fn white_rice_is_limited_with_minimum_portion() {
    let decision = DecisionEngine::decide(
        &item("white rice", 78.3, 0.1, 0.4),
        DiabetesType::Type2,
    );
    assert_eq!(decision.category, Suitability::Limit);
    assert_eq!(
        decision.portion_text,
        "20g portion. Keep portions small; pair with protein/fiber."
    );
    assert_eq!(
        decision.alternatives,
        vec!["brown rice", "cauliflower rice", "quinoa"]
    );
}

#[test]
fn soda_hits_avoid_and_sugary_swaps() {
    let decision = DecisionEngine::decide(&item("cola soda", 22.0, 22.0, 0.0), DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Avoid);
    assert_eq!(
        decision.alternatives,
        vec![
            "unsweetened yogurt",
            "nuts",
            "fruit with peel",
            "water/unsweetened tea"
        ]
    );
}

#[test]
fn fiber_downgrades_limit_to_small_portion() {
    // Sugars keep the base verdict at LIMIT; fiber softens it one step.
    let decision = DecisionEngine::decide(&item("bran mix", 40.0, 16.0, 6.0), DiabetesType::Type1);
    assert_eq!(decision.category, Suitability::SmallPortion);
    assert!(decision.reason.ends_with("(High fiber content helps)"));
}

#[test]
fn fiber_downgrades_small_portion_to_safe() {
    let decision = DecisionEngine::decide(&item("lentil mix", 15.0, 1.0, 5.0), DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Safe);
    assert!(decision.reason.ends_with("(High fiber content helps)"));
}

#[test]
fn more_fiber_never_worsens_the_verdict() {
    let rank = |s: Suitability| match s {
        Suitability::Safe => 0,
        Suitability::SmallPortion => 1,
        Suitability::Limit => 2,
        Suitability::Avoid => 3,
        Suitability::Unknown => 4,
    };
    for diabetes_type in [DiabetesType::Type1, DiabetesType::Type2] {
        let low = DecisionEngine::decide(&item("grain bowl", 40.0, 10.0, 0.0), diabetes_type);
        let high = DecisionEngine::decide(&item("grain bowl", 40.0, 10.0, 6.0), diabetes_type);
        assert!(
            rank(high.category) <= rank(low.category),
            "fiber made the {diabetes_type} verdict worse"
        );
    }
}

#[test]
fn type2_escalates_sugary_small_portions() {
    let decision = DecisionEngine::decide(&item("kheer", 20.0, 12.0, 0.0), DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Limit);
    assert_eq!(decision.reason, "High sugar content for Type 2 diabetes");
}

#[test]
fn type2_escalates_carb_dense_small_portions() {
    let decision = DecisionEngine::decide(&item("poha", 34.0, 1.0, 0.0), DiabetesType::Type2);
    assert_eq!(decision.category, Suitability::Limit);
    assert_eq!(decision.reason, "High net carbs for Type 2 diabetes");
}

#[test]
fn type1_keeps_small_portion_where_type2_escalates() {
    let food = item("kheer", 20.0, 12.0, 0.0);
    let t1 = DecisionEngine::decide(&food, DiabetesType::Type1);
    let t2 = DecisionEngine::decide(&food, DiabetesType::Type2);
    assert_eq!(t1.category, Suitability::SmallPortion);
    assert_eq!(t2.category, Suitability::Limit);
    assert_eq!(
        t1.portion_text,
        "75g portion. Monitor carbs; follow your care plan."
    );
}

#[test]
fn portion_is_100g_when_net_carbs_are_zero() {
    assert_eq!(DecisionEngine::portion_grams(0.0), 100);
    assert_eq!(DecisionEngine::portion_grams(-1.0), 100);
}

#[test]
fn portion_clamps_to_serving_range() {
    assert_eq!(DecisionEngine::portion_grams(75.0), 20);
    assert_eq!(DecisionEngine::portion_grams(1.0), 300);
    assert_eq!(DecisionEngine::portion_grams(15.0), 100);
}

#[test]
fn roti_bucket_and_default_bucket() {
    let roti = DecisionEngine::decide(&item("plain naan", 50.0, 3.0, 2.0), DiabetesType::Type2);
    assert_eq!(roti.alternatives, vec!["whole wheat roti", "multigrain roti"]);

    let default = DecisionEngine::decide(&item("paneer tikka", 5.0, 2.0, 0.0), DiabetesType::Type2);
    assert_eq!(
        default.alternatives,
        vec!["dal", "grilled fish/chicken", "non-starchy vegetables"]
    );
}

#[test]
fn fried_snack_bucket() {
    let decision = DecisionEngine::decide(&item("aloo samosa", 30.0, 3.0, 2.0), DiabetesType::Type2);
    assert_eq!(
        decision.alternatives,
        vec!["roasted chana", "baked options", "salad"]
    );
}
