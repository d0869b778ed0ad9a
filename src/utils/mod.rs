// Utility modules

pub mod password;
pub mod validation;
pub mod workflow_error;

pub use password::{PasswordConfig, PasswordError, PasswordService};
pub use validation::{normalize_email, trim_optional_field, validation_message};
pub use workflow_error::{WorkflowError, WorkflowErrorResponse, WorkflowResult};
