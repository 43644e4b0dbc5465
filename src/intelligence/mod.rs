// ABOUTME: Intelligence module - deterministic suitability classification
// ABOUTME: Re-exports the decision engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// Suitability decision engine
pub mod decision;

pub use decision::DecisionEngine;
