pub mod loader;
pub mod writer;
