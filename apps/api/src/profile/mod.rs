// Profile: plan, usage and branding for the signed-in user.

pub mod handlers;
