pub mod baseline;
pub mod defs;
pub mod empty;
pub mod state;
