pub mod account_dto;
pub mod quiz_dto;
pub mod study_dto;
