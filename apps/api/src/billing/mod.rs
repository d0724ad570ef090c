// Billing: plan tiers, quota checks, and subscription webhooks.

pub mod handlers;
pub mod plans;
pub mod webhooks;
