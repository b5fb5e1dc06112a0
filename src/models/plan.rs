// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription plan catalog (read-only; no billing happens here).

use serde::Serialize;

/// Billing period shown next to the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    None,
    Week,
    Month,
    Year,
}

/// One entry of the plan catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: &'static str,
    pub price_cents: u32,
    pub period: BillingPeriod,
    pub description: &'static str,
    /// Analyses granted per period; `None` means unlimited
    pub analyses_per_period: Option<u32>,
    pub features: &'static [&'static str],
    pub is_popular: bool,
}

static PLANS: [Plan; 4] = [
    Plan {
        name: super::user::FREE_PLAN_NAME,
        price_cents: 0,
        period: BillingPeriod::None,
        description: "Try a single face analysis on us.",
        analyses_per_period: Some(super::user::INITIAL_ANALYSES),
        features: &["1 Face Analysis", "Save your analysis result"],
        is_popular: false,
    },
    Plan {
        name: "Weekly Sparkle",
        price_cents: 499,
        period: BillingPeriod::Week,
        description: "For those who want to give it a try.",
        analyses_per_period: Some(5),
        features: &[
            "5 Face Analyses per week",
            "Basic style recommendations",
            "Save up to 10 analysis results",
        ],
        is_popular: false,
    },
    Plan {
        name: "Monthly Glow-Up",
        price_cents: 1499,
        period: BillingPeriod::Month,
        description: "Perfect for the dedicated style enthusiast.",
        analyses_per_period: None,
        features: &[
            "Unlimited Face Analyses",
            "Advanced style recommendations",
            "Save unlimited analysis results",
            "Early access to new tools",
        ],
        is_popular: true,
    },
    Plan {
        name: "Annual Radiance",
        price_cents: 9999,
        period: BillingPeriod::Year,
        description: "Become a true style icon.",
        analyses_per_period: None,
        features: &[
            "All Monthly Glow-Up features",
            "Personalized AI stylist consultations",
            "Exclusive access to premium content",
            "20% off all future products",
        ],
        is_popular: false,
    },
];

/// All plans, free plan first.
pub fn catalog() -> &'static [Plan] {
    &PLANS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str) -> Option<&'static Plan> {
        catalog().iter().find(|p| p.name == name)
    }

    #[test]
    fn test_free_plan_matches_initial_grant() {
        let free = find("Free").expect("free plan");
        assert_eq!(free.price_cents, 0);
        assert_eq!(free.analyses_per_period, Some(1));
    }

    #[test]
    fn test_exactly_one_popular_plan() {
        assert_eq!(catalog().iter().filter(|p| p.is_popular).count(), 1);
        assert!(find("Monthly Glow-Up").unwrap().is_popular);
    }
}
