//! Application services for tenancy administration.

mod administration;

pub use administration::{
    CompanyTransferOutcome, CompanyTransferRequest, RegisterUserRequest, TenancyService,
    TenancyServiceError, TenancyServiceResult,
};
