pub mod account;
pub mod health;
pub mod quiz;
pub mod study;
