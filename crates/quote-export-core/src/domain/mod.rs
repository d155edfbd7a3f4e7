//! Domain model (quote rows, blob keys, envelopes, errors, states).

pub mod envelope;
pub mod errors;
pub mod quote;
pub mod state;

pub use self::envelope::{InvocationContext, ResponseEnvelope, STATUS_FAILED, STATUS_OK};
pub use self::errors::{Deadline, ErrorKind, ExportError};
pub use self::quote::{BlobKey, ExportUnit, QuoteRecord};
pub use self::state::InvocationState;
