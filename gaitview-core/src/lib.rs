//! Client-side engine for browsing a gait backend: paginated commit feed,
//! durable diff-panel expansion, split/unified diff layout and reconciliation
//! of pushed events. Nothing here draws to a terminal.

pub mod api;
pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod expansion;
pub mod feed;
pub mod fetch;
pub mod layout;
pub mod markup;
pub mod panel;
pub mod prefs;
pub mod reconcile;
pub mod schema;
pub mod search;
pub mod types;
