mod conversions;
mod types;

pub use types::{
    AccessEventResponse, AccessGrantResponse, ConsumeAccessRequest, ConsumeAccessResponse,
    CreateAccessGrantRequest, IssuedAccessGrantResponse, UpdateAccessGrantRequest,
};
