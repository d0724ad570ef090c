// Templates: reusable tone, pricing and section configuration.

pub mod handlers;
