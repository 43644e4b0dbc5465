// ABOUTME: Service layer - composition of stores, tiers, and the decision engine
// ABOUTME: Re-exports the resolution orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CarbSense Contributors

/// Resolution orchestrator
pub mod resolver;

pub use resolver::FoodResolutionService;
