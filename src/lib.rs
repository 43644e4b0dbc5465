// ABOUTME: CarbSense library root - food lookup and diabetes-suitability decisions
// ABOUTME: Module tree for stores, resolution tiers, decision engine, and orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

//! # CarbSense
//!
//! Resolves a food name or barcode into a per-100g nutrition record and a
//! diabetes-suitability verdict. Resolution walks an ordered chain:
//! query history, keyed cache, an offline regional dataset, Open Food
//! Facts, USDA FoodData Central, and finally a generative-model fallback
//! that degrades to a fixed static estimate. Every successful lookup is
//! cached and recorded in a bounded per-(query, diabetes-type) history.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Nutrition-record cache: key grammar, trait, in-memory store
pub mod cache;
/// Environment-driven application configuration
pub mod config;
/// Domain constants: thresholds, bounds, endpoints, nutrient ids
pub mod constants;
/// SQLite persistence for both stores
pub mod database;
/// Error types and the crate-wide result alias
pub mod errors;
/// Query-history store: trait and in-memory implementation
pub mod history;
/// Rule-based decision engine
pub mod intelligence;
/// Generative-model fallback tier
pub mod llm;
/// Structured logging setup
pub mod logging;
/// Core data structures
pub mod models;
/// Resolution tiers over remote and offline sources
pub mod providers;
/// Resolution orchestrator
pub mod services;

pub use errors::{AppError, AppResult, ErrorCode};
pub use models::{
    normalize_query, Decision, DiabetesType, FoodItem, FoodResolution, FoodSource, HistoryEntry,
    Suitability,
};
pub use services::FoodResolutionService;
