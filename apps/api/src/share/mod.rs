// Share: public, token-addressed proposal view and client response.

pub mod handlers;
