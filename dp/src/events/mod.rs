//! Event bus for decoupled notifications
//!
//! The planner and scheduler publish events without knowing who listens.
//! Chat notifiers, loggers and tests subscribe per event type.
//!
//! ```text
//!   PlanGenerator ──┐                      ┌──► EventLogger (.jsonl)
//!                   ├──► EventBus ─────────┼──► notification layer
//!   Scheduler ──────┤   publish (fan-out)  └──► ...
//!   ApprovalFlow ───┘   publish_async (queue)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use dailyplan::events::{EventType, create_event_bus, handler_fn};
//!
//! let bus = create_event_bus();
//! bus.subscribe(EventType::TaskBlocked, handler_fn("notify", |event| async move {
//!     println!("blocked: {}", event.event_data()["task_key"]);
//!     Ok(())
//! }));
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{EventBus, EventHandler, FnHandler, PublishSummary, SubscriptionId, create_event_bus, handler_fn};
pub use logger::{EventLogger, read_events};
pub use types::{Event, EventPayload, EventType};
