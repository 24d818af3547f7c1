pub mod accuracy_bar;
pub mod color;
pub mod terminal;
