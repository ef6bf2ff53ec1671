pub mod query_envelope;
pub mod table;

pub use query_envelope::{
    QUERY_ENVELOPE_SCHEMA_VERSION, QueryEnvelope, QueryEnvelopeCommandFailure, QueryEnvelopeError,
    QueryEnvelopeMeta, QueryEnvelopeWarning,
};
pub use table::{
    AGENT_COLUMN, CHANNEL_COLUMN, CONNECTED_COLUMN, CONTACT_ID_COLUMN, Cell, DISCONNECT_COLUMN,
    INITIATION_COLUMN, LAST_UPDATE_COLUMN, RecordTable, SOURCE_FILE_COLUMN,
};
