pub mod config;
pub mod controller;
pub mod events;
pub mod presenter;
pub mod registry;
pub mod reveal;
pub mod scene;
pub mod session;
pub mod store;
