//! Domain model (ids, tenants, remote status, records, errors, ...).

pub mod errors;
pub mod ids;
pub mod policy;
pub mod query;
pub mod record;
pub mod state;
pub mod status;
pub mod tenant;
pub mod webhook;

pub use errors::{FetchError, SubmissionError, TimeoutReason, TransportError};
pub use ids::{FetchId, Id, IdMarker};
pub use policy::FetchPolicy;
pub use query::{BulkQuery, SubmitResponse, SubmittedOperation, UserError};
pub use record::DecodedRecord;
pub use state::FetchPhase;
pub use status::{BulkOperationId, BulkOperationState, BulkOperationStatus};
pub use tenant::{CorrelationKey, TenantId};
pub use webhook::BulkFinishWebhook;
