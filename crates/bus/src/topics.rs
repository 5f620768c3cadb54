//! Default exchange and routing key for template updates.
//!
//! Subscribers filter by routing-key prefix, so every template update shares
//! the `templates.` namespace.

/// Exchange template updates are published on.
pub const TEMPLATES_EXCHANGE: &str = "templates";

/// Routing key for a new or updated canonical template.
pub const TEMPLATES_UPDATE: &str = "templates.update";
