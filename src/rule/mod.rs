//! Segmentation rule model
//!
//! Leaf conditions authored in a rule builder, the assembler that turns them
//! into an expression tree for the audience-evaluation endpoint, and the
//! renderer that produces the matching human-readable summary.

pub mod assembler;
mod ast;
mod draft;
mod leaf;
pub mod session;
pub mod summary;


pub use assembler::assemble;
pub use ast::*;
pub use draft::*;
pub use leaf::*;
pub use session::DraftSession;
pub use summary::{render, render_leaf, render_tree};
