pub mod grid;
pub mod simulate;
