// Wire record model and validation
pub mod record;

// Live-entity store with per-id expiry
pub mod store;

// Event subscription fan-out
pub mod hub;

// Feed transport lifecycle and reconnection
pub mod connection;

// Registry of independently connected feed clients
pub mod registry;

// Mock feed generator
pub mod simulator;

// Configuration
pub mod config;
