pub mod account;
pub mod question;
pub mod quiz;
pub mod session;
