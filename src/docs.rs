use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::{access, common, handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::request_otp,
        handlers::auth::verify_otp,
        handlers::auth::me,

        // --- Company ---
        handlers::companies::register,
        handlers::companies::get_profile,
        handlers::companies::update_profile,

        // --- Branches ---
        handlers::branches::list_branches,
        handlers::branches::get_branch,
        handlers::branches::create_branch,
        handlers::branches::update_branch,

        // --- Users ---
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,

        // --- Customers ---
        handlers::customers::create_customer,
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::update_customer,

        // --- Consignments ---
        handlers::consignments::book_consignment,
        handlers::consignments::list_consignments,
        handlers::consignments::get_consignment,
        handlers::consignments::update_consignment,
        handlers::consignments::update_status,
        handlers::consignments::get_tracking,
        handlers::consignments::download_note,

        // --- Manifests ---
        handlers::manifests::create_manifest,
        handlers::manifests::list_manifests,
        handlers::manifests::get_manifest,
        handlers::manifests::arrive_manifest,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_bookings_chart,
        handlers::dashboard::get_branch_activity,
    ),
    components(
        schemas(
            common::response::Pagination,
            access::role::Role,

            // --- Auth ---
            models::auth::User,
            models::auth::LoginPayload,
            models::auth::OtpRequestPayload,
            models::auth::OtpVerifyPayload,
            models::auth::AuthResponse,
            models::auth::OtpRequested,

            // --- Company & branches ---
            models::company::Company,
            models::company::Branch,
            models::company::RegisterCompanyPayload,
            models::company::BranchDraft,
            models::company::AdminDraft,
            models::company::CompanyRegistered,
            models::company::UpdateCompanyPayload,
            models::company::UpdateBranchPayload,

            // --- Users ---
            models::user::CreateUserPayload,
            models::user::UpdateUserPayload,

            // --- Customers ---
            models::customer::Customer,
            models::customer::CreateCustomerPayload,
            models::customer::UpdateCustomerPayload,

            // --- Consignments ---
            models::consignment::ConsignmentStatus,
            models::consignment::PaymentMode,
            models::consignment::Consignment,
            models::consignment::TrackingEvent,
            models::consignment::BookConsignmentPayload,
            models::consignment::UpdateConsignmentPayload,
            models::consignment::UpdateStatusPayload,

            // --- Manifests ---
            models::manifest::ManifestStatus,
            models::manifest::Manifest,
            models::manifest::ManifestDetail,
            models::manifest::CreateManifestPayload,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
            models::dashboard::StatusCount,
            models::dashboard::BookingChartEntry,
            models::dashboard::BranchActivity,
        )
    ),
    tags(
        (name = "Auth", description = "Password and one-time-code sign-in"),
        (name = "Company", description = "Onboarding and company profile"),
        (name = "Branches", description = "Branch directory"),
        (name = "Users", description = "Staff accounts (administrators only)"),
        (name = "Customers", description = "Customer directory"),
        (name = "Consignments", description = "Booking, status and tracking"),
        (name = "Manifests", description = "OGPL dispatch and arrival"),
        (name = "Dashboard", description = "Booking indicators")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
