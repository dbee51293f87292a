//! Core of the game-thread bot: the thread lifecycle state machine, the
//! template renderer, and the no-hitter monitor, behind ports for the game
//! feed, the posting platform, and the thread store.

/// Runtime configuration.
pub mod config;
/// Explicit dependency bundle.
pub mod context;
/// Thread store port and backends.
pub mod dao;
/// Service error taxonomy.
pub mod error;
/// Game feed port and backends.
pub mod feed;
/// Posting platform port and backends.
pub mod posting;
/// Template rendering.
pub mod render;
/// Pass orchestration.
pub mod services;
/// Lifecycle state machine.
pub mod state;
