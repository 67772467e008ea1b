pub mod interner;
pub mod time;
