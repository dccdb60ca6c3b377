mod errors;
mod parser;
mod types;
mod writer;

pub use errors::{DecodeError, EncodeError};
pub use types::{
    DnsHeader, DnsMessage, DnsQuestion, DnsRecord, QueryType, RecordClass, RecordData,
    ResponseCode, MAX_LABEL_LEN, MAX_NAME_LEN,
};

pub use parser::decode_name;
pub use writer::encode_name;
