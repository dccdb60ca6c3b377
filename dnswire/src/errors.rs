use thiserror::Error;

/// Reasons a message value cannot be turned into wire bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Domain name is empty")]
    NameEmpty,

    #[error("Label `{label}` is {len} bytes long, the limit is 63")]
    LabelTooLong { label: String, len: usize },

    #[error("Domain name `{0}` contains an empty label")]
    EmptyLabel(String),

    #[error("Domain name `{name}` encodes to {len} bytes, the limit is 255")]
    NameTooLong { name: String, len: usize },

    #[error("Declared rdata length {declared} does not match the {actual} bytes of rdata")]
    RdataLengthMismatch { declared: u16, actual: usize },

    #[error("Rdata of {0} bytes does not fit a 16 bit length")]
    RdataTooLong(usize),

    #[error("The {section} section holds {len} entries, more than a 16 bit count allows")]
    SectionTooLarge { section: &'static str, len: usize },
}

/// Reasons a byte buffer is not a well-formed message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of packet, {remaining} bytes were left to read")]
    UnexpectedEof { remaining: usize },

    #[error("Compression pointer found at a label boundary, compression is not supported")]
    CompressionUnsupported,

    #[error("Label length byte {0:#04x} uses a reserved label type")]
    InvalidLabelType(u8),

    #[error("Domain name exceeds 255 bytes")]
    NameTooLong,

    #[error("Label `{0}` contains a dot")]
    DotInLabel(String),

    #[error("Record of type {rtype} does not exactly fill its declared {rdlen} bytes of rdata")]
    RdataLengthMismatch { rtype: u16, rdlen: u16 },

    #[error("{0} bytes left over after the last section")]
    TrailingBytes(usize),
}
