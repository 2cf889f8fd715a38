//! Deploy domain module
//!
//! Request validation, the upload pipeline and the errors it can raise.

mod entity;
mod error;
mod ids;
mod profile;
mod service;

pub use entity::{ExecutionResult, ExtractReport, FormFields, UploadRequest, UploadedFile};
pub use error::{DeployError, ExtractError, Result, RunError, ValidationError};
pub use ids::RequestId;
pub use profile::{
    EndpointProfile, FieldRule, ResponseMode, TargetRule, DEFAULT_LEGACY_MAX_FORM_BYTES,
    DEFAULT_MAX_FORM_BYTES,
};
pub use service::{DeployService, SCRIPT_DONE_MESSAGE};
