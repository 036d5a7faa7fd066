pub mod nth;
pub mod selector;
pub mod spec;

pub use nth::NthExpr;
pub use selector::{AttrFilter, AttrMode, ParsedSelector, parse};
pub use spec::{GroupEntry, SelectorSpec};
