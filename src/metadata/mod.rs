pub mod error;
pub mod model;
pub mod persist;
pub mod reconcile;
pub mod schema;
pub mod validate;
pub mod working;

pub use error::{CurationError, SessionWarning};
pub use model::MetadataRecord;
pub use reconcile::{reconcile, AvailableColumns};
pub use schema::normalize;
pub use validate::{validate, ValidationIssue};
pub use working::{EditError, FieldEdit, WorkingRecord};
