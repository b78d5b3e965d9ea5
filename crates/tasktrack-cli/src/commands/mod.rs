pub mod add;
pub mod delete;
pub mod read;
pub mod schedule;
pub mod update;
