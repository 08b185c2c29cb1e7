pub mod fetch;
pub mod read;
pub mod score;
pub mod spec;
