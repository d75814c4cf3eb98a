pub mod analyzer_service;
pub mod export_service;
pub mod extract_service;
pub mod quiz_service;
pub mod session_service;
