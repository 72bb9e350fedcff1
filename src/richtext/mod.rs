pub mod document_tree;
pub mod range;
pub mod surface;

pub mod caret;
pub mod command;
pub mod editor;
pub mod highlight;
pub mod history;
pub mod mutation;
pub mod selection;
pub mod splice;
