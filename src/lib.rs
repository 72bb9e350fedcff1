// Library exports for richedit

pub mod config;
pub mod richtext;
pub mod script;
