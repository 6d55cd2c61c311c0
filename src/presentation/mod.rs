// Presentation layer - view state and the local HTTP surface
pub mod app_state;
pub mod handlers;
pub mod router;
pub mod view_model;
pub mod view_store;
