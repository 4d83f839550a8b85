pub mod auth;
pub mod branches;
pub mod companies;
pub mod consignments;
pub mod customers;
pub mod dashboard;
pub mod manifests;
pub mod users;
