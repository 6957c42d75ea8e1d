//! Admin mutations on skill definitions and category budgets.

pub mod editor;

pub use editor::AdminEditor;
