//! The parsing state machine and tree construction.

/// Parser driver, per-state transitions and tree printing.
pub mod core;
mod helpers;
mod nesting;
/// Parser states.
pub mod state;

pub use self::core::{HtmlParser, ParseOutput, format_tree, print_tree};
pub use state::ParseState;
