//! Risk tier to messaging strategy lookup for the default four-tier model

use serde::Serialize;

/// Messaging guidance attached to a risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStrategy {
    pub tier: usize,
    /// Short profile label shown to operators
    pub profile: &'static str,
    /// Instruction handed to the message writer
    pub instruction: &'static str,
}

pub const TIER_STRATEGIES: [TierStrategy; 4] = [
    TierStrategy {
        tier: 0,
        profile: "Low risk / resilient payer",
        instruction: "Write a short, preventive and cordial reminder.",
    },
    TierStrategy {
        tier: 1,
        profile: "Mild risk / irregular payer",
        instruction: "Write an objective message encouraging the customer to regularize.",
    },
    TierStrategy {
        tier: 2,
        profile: "Recurring risk / financial pressure",
        instruction: "Write an empathetic message proposing a negotiation.",
    },
    TierStrategy {
        tier: 3,
        profile: "High risk / critical",
        instruction: "Write a firm message asking the customer to contact a human agent.",
    },
];

/// Strategy for a tier; `None` outside the four-tier table
pub fn strategy_for(tier: usize) -> Option<&'static TierStrategy> {
    TIER_STRATEGIES.get(tier)
}
