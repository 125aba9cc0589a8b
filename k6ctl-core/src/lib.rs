pub mod config;
pub mod history;
pub mod model;

// k6 REST API contract
pub mod api;

// Render models derived from history on every redraw
pub mod chart;
pub mod rates;

// Screen partitioning
pub mod layout;
