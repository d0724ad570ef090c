// Proposals: owner-facing CRUD, lifecycle, sharing, activity and PDF export.

pub mod handlers;
