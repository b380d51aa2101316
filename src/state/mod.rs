//! State module for tracking pagination progress
//!
//! # Components
//!
//! - `PagerState`: where a nearby-search pager is in its continuation-token chain
//! - `TokenGate`: the mandatory delay before a continuation token may be reused

mod pager_state;
mod token_gate;

pub use pager_state::PagerState;
pub use token_gate::TokenGate;
