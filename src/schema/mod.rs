pub mod content;
pub mod mode;
