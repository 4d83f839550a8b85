pub mod branch_repo;
pub mod company_repo;
pub mod consignment_repo;
pub mod customer_repo;
pub mod dashboard_repo;
pub mod manifest_repo;
pub mod user_repo;

pub use branch_repo::BranchRepository;
pub use company_repo::CompanyRepository;
pub use consignment_repo::ConsignmentRepository;
pub use customer_repo::CustomerRepository;
pub use dashboard_repo::DashboardRepository;
pub use manifest_repo::ManifestRepository;
pub use user_repo::UserRepository;
