//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `PageState`: the states a listing page passes through
//! - `PageCycle`: a single page's walk through those states, rejecting illegal steps

mod page_cycle;
mod page_state;

// Re-export main types
pub use page_cycle::PageCycle;
pub use page_state::PageState;
