// Clients: proposal recipients owned by a user.

pub mod handlers;
