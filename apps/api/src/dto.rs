mod access_grants;
mod common;

pub use access_grants::{
    AccessEventResponse, AccessGrantResponse, ConsumeAccessRequest, ConsumeAccessResponse,
    CreateAccessGrantRequest, IssuedAccessGrantResponse, UpdateAccessGrantRequest,
};
pub use common::{HealthDependencyStatus, HealthResponse};
