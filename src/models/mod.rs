//! Scheduling domain models.
//!
//! Value types for the repair scheduler: lanes, items and placements, plus
//! the mutable plan container the repair loop works on.
//!
//! # Lifecycle
//!
//! | Type | Created by | Mutated |
//! |------|-----------|---------|
//! | Lane, Item | Caller | Never |
//! | ScheduledItem | Plan / scheduler | Never (moves produce new values) |
//! | Plan | Scheduler | By replacement of placements |

mod item;
mod lane;
mod plan;
mod scheduled;

pub use item::{Item, ItemId};
pub use lane::Lane;
pub use plan::Plan;
pub use scheduled::ScheduledItem;
