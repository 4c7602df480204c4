//! # Core Application Logic
//!
//! Pocket's business logic: the streaming conversation reconciliation engine.
//! It knows nothing about terminals or HTTP.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │ Vec<Effect>
//!                                ▼
//!                    ┌─────────────────────────┐
//!                    │        RUNTIME          │
//!                    │ streams, reloads, votes │
//!                    └─────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct holding all application state in one place
//! - [`action`]: `Action`, `Effect` and the `update()` reducer
//! - [`conversation`]: the displayed list of persisted/provisional entries
//! - [`session`]: session registry
//! - [`history`]: per-session persisted history and reload generations
//! - [`feedback`]: latest local vote per message
//! - [`config`]: config file + env + CLI resolution

pub mod action;
pub mod config;
pub mod conversation;
pub mod feedback;
pub mod history;
pub mod message;
pub mod params;
pub mod session;
pub mod state;
