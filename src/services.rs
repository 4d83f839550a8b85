pub mod auth;
pub mod company_service;
pub mod consignment_service;
pub mod customer_service;
pub mod dashboard_service;
pub mod document_service;
pub mod manifest_service;
pub mod notify;
pub mod user_service;
