//! # TUI Components
//!
//! Stateless components take everything as props and are rebuilt each frame:
//! - `TitleBar`: session, status and streaming indicator
//! - `Sidebar`: session list
//! - `MetricsOverlay`: server diagnostics popup
//!
//! Stateful components keep presentation state across frames:
//! - `InputBox`: prompt editor (owns its buffer)
//! - `MessageList`: conversation view (state in `MessageListState`)
//!
//! Components never read `App` directly; the caller passes what they show.

pub mod input_box;
pub mod message_list;
pub mod metrics_overlay;
pub mod sidebar;
pub mod title_bar;

pub use input_box::{InputBox, InputEvent};
pub use message_list::{MessageList, MessageListState};
pub use metrics_overlay::MetricsOverlay;
pub use sidebar::Sidebar;
pub use title_bar::TitleBar;
