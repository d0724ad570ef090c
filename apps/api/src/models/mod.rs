pub mod activity;
pub mod client;
pub mod profile;
pub mod proposal;
pub mod template;
