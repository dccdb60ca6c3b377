use std::{
    convert::TryFrom,
    net::{Ipv4Addr, Ipv6Addr},
};
use typed_builder::TypedBuilder;

use crate::{errors::EncodeError, writer::encoded_name_len};

/// Longest label a length byte can describe without colliding with the pointer flags.
pub const MAX_LABEL_LEN: usize = 63;
/// Longest encoded name, terminator included.
pub const MAX_NAME_LEN: usize = 255;

// All communications inside of the domain protocol are carried in a single
// format called a message.  The top level format of message is divided
// into 5 sections (some of which are empty in certain cases) shown below:
//
//     +---------------------+
//     |        Header       |
//     +---------------------+
//     |       Question      | the question for the name server
//     +---------------------+
//     |        Answer       | RRs answering the question
//     +---------------------+
//     |      Authority      | RRs pointing toward an authority
//     +---------------------+
//     |      Additional     | RRs holding additional information
//     +---------------------+
//
// The section counts in the header belong to the message: they are updated
// by the `add_*` methods and can not drift from the sections themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsMessage {
    header: DnsHeader,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsRecord>,
    authorities: Vec<DnsRecord>,
    additionals: Vec<DnsRecord>,
}

// The header contains the following fields:
//                                  1  1  1  1  1  1
//    0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                      ID                       |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                    QDCOUNT                    |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                    ANCOUNT                    |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                    NSCOUNT                    |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                    ARCOUNT                    |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct DnsHeader {
    // Transaction identifier, copied from the query into the response.
    pub id: u16,

    // 0 for queries, 1 for responses.
    #[builder(default = false)]
    pub response: bool,

    // A four bit field that specifies kind of query in this message.  This value is set by the
    // originator of a query and copied into the response.  The values are:
    // 0     a standard query (QUERY)
    // 1     an inverse query (IQUERY)
    // 2     a server status request (STATUS)
    // 3-15  reserved for future use
    // Only the low four bits are encoded.
    #[builder(default = 0)]
    pub opcode: u8,
    // Authoritative Answer - the responding name server is an authority for the domain name in
    // question section.
    #[builder(default = false)]
    pub authoritative_answer: bool,
    // TrunCation - specifies that this message was truncated due to length greater than that
    // permitted on the transmission channel.
    #[builder(default = false)]
    pub truncated_message: bool,
    // Recursion Desired - may be set in a query and is copied into the response.
    #[builder(default = false)]
    pub recursion_desired: bool,
    // Recursion Available - set or cleared in a response.
    #[builder(default = false)]
    pub recursion_available: bool,
    // Reserved, three bits. Only the low three bits are encoded.
    #[builder(default = 0)]
    pub z: u8,
    #[builder(default = ResponseCode::NOERROR)]
    pub rescode: ResponseCode, // 4 bits

    // The number of entries in the Question Section
    #[builder(default = 0)]
    pub questions: u16,
    // The number of entries in the Answer Section
    #[builder(default = 0)]
    pub answers: u16,
    // The number of entries in the Authority Section
    #[builder(default = 0)]
    pub authoritative_entries: u16,
    // The number of entries in the Additional Section
    #[builder(default = 0)]
    pub resource_entries: u16,
}

impl DnsHeader {
    /// Encoded size of a header.
    pub const LEN: usize = 12;

    /// Packs the flag fields into the second header word.
    pub fn flags(&self) -> u16 {
        (self.rescode.to_num() as u16)
            | ((self.z as u16 & 0x07) << 4)
            | ((self.recursion_available as u16) << 7)
            | ((self.recursion_desired as u16) << 8)
            | ((self.truncated_message as u16) << 9)
            | ((self.authoritative_answer as u16) << 10)
            | ((self.opcode as u16 & 0x0F) << 11)
            | ((self.response as u16) << 15)
    }
}

//  Response code - this 4 bit field is set as part of responses.  The values have the following
//  interpretation:
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    // No error condition
    NOERROR,
    // Format error - The name server was unable to interpret the query.
    FORMERR,
    // Server failure - The name server was unable to process this query due to a problem with the
    // name server.
    SERVFAIL,
    // Name Error - the domain name referenced in the query does not exist.
    NXDOMAIN,
    // Not Implemented - The name server does not support the requested kind of query.
    NOTIMP,
    // Refused - The name server refuses to perform the specified operation for policy reasons.
    REFUSED,
    // 6-15  Reserved for future use, carried as is.
    RESERVED(u8),
}

impl ResponseCode {
    pub fn to_num(self) -> u8 {
        match self {
            ResponseCode::NOERROR => 0,
            ResponseCode::FORMERR => 1,
            ResponseCode::SERVFAIL => 2,
            ResponseCode::NXDOMAIN => 3,
            ResponseCode::NOTIMP => 4,
            ResponseCode::REFUSED => 5,
            ResponseCode::RESERVED(x) => x & 0x0F,
        }
    }

    pub fn from_num(num: u8) -> ResponseCode {
        match num & 0x0F {
            0 => ResponseCode::NOERROR,
            1 => ResponseCode::FORMERR,
            2 => ResponseCode::SERVFAIL,
            3 => ResponseCode::NXDOMAIN,
            4 => ResponseCode::NOTIMP,
            5 => ResponseCode::REFUSED,
            x => ResponseCode::RESERVED(x),
        }
    }
}

// The question section is used to carry the "question" in most queries, i.e., the parameters that
// define what is being asked.  The section contains QDCOUNT (usually 1) entries, each of the
// following format:
//                                  1  1  1  1  1  1
//    0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                                               |
//  /                     QNAME                     /
//  /                                               /
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                     QTYPE                     |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//  |                     QCLASS                    |
//  +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    // The domain name, dotted. Encoded as a sequence of labels.
    pub name: String,
    pub qtype: QueryType,
    pub qclass: RecordClass,
}

impl DnsQuestion {
    /// An internet class question.
    pub fn new(name: impl Into<String>, qtype: QueryType) -> Self {
        DnsQuestion {
            name: name.into(),
            qtype,
            qclass: RecordClass::IN,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy)]
pub enum QueryType {
    UNKNOWN(u16),
    A,
    CNAME,
    NS,
    MX,
    AAAA,
}

impl QueryType {
    pub fn to_num(self) -> u16 {
        match self {
            QueryType::UNKNOWN(x) => x,
            QueryType::A => 1,
            QueryType::CNAME => 5,
            QueryType::NS => 2,
            QueryType::MX => 15,
            QueryType::AAAA => 28,
        }
    }

    pub fn from_num(num: u16) -> QueryType {
        match num {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            15 => QueryType::MX,
            28 => QueryType::AAAA,
            _ => QueryType::UNKNOWN(num),
        }
    }
}

// Almost everything on the wire is IN. The others survive a decode/encode cycle untouched.
#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy)]
pub enum RecordClass {
    UNKNOWN(u16),
    IN,
    CS,
    CH,
    HS,
}

impl RecordClass {
    pub fn to_num(self) -> u16 {
        match self {
            RecordClass::UNKNOWN(x) => x,
            RecordClass::IN => 1,
            RecordClass::CS => 2,
            RecordClass::CH => 3,
            RecordClass::HS => 4,
        }
    }

    pub fn from_num(num: u16) -> RecordClass {
        match num {
            1 => RecordClass::IN,
            2 => RecordClass::CS,
            3 => RecordClass::CH,
            4 => RecordClass::HS,
            _ => RecordClass::UNKNOWN(num),
        }
    }
}

// The answer, authority, and additional sections all share the same format: a variable number of
// resource records, where the number of records is specified in the corresponding count field in
// the header.  Each resource record has the following format:
//                                     1  1  1  1  1  1
//       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//     |                                               |
//     /                                               /
//     /                      NAME                     /
//     |                                               |
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//     |                      TYPE                     |
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//     |                     CLASS                     |
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//     |                      TTL                      |
//     |                                               |
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//     |                   RDLENGTH                    |
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
//     /                     RDATA                     /
//     /                                               /
//     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//
// TYPE is taken from the rdata variant and RDLENGTH from the encoded rdata, so neither can
// disagree with the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub class: RecordClass,
    // Seconds
    pub ttl: u32,
    pub data: RecordData,
}

impl DnsRecord {
    /// An internet class record.
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        DnsRecord {
            name: name.into(),
            class: RecordClass::IN,
            ttl,
            data,
        }
    }

    /// Builds a record from a caller supplied rdata length, which must match the encoded rdata.
    pub fn with_rdlen(
        name: impl Into<String>,
        class: RecordClass,
        ttl: u32,
        rdlen: u16,
        data: RecordData,
    ) -> Result<Self, EncodeError> {
        let actual = data.wire_len()?;
        if actual != rdlen as usize {
            return Err(EncodeError::RdataLengthMismatch {
                declared: rdlen,
                actual,
            });
        }

        Ok(DnsRecord {
            name: name.into(),
            class,
            ttl,
            data,
        })
    }

    pub fn rtype(&self) -> QueryType {
        self.data.record_type()
    }

    /// The RDLENGTH this record is written with.
    pub fn rdlen(&self) -> Result<u16, EncodeError> {
        let len = self.data.wire_len()?;
        u16::try_from(len).map_err(|_| EncodeError::RdataTooLong(len))
    }
}

// | ID | Name  | Description                              | Encoding                         |
// |----+-------+------------------------------------------+----------------------------------|
// | 1  | A     | Alias - Mapping names to IP addresses    | Four bytes for IPv4 adress       |
// | 2  | NS    | Name Server - The DNS server address     | Label Sequence                   |
// | 5  | CNAME | Canonical Name - Maps names to names     | Label Sequence                   |
// | 15 | MX    | Mail eXchange - mail server for a domain | 2-bytes priority + Label Sequence|
// | 28 | AAAA  | IPv6 alias                               | Sixteen bytes for IPv6 adress    |
//
// Anything else is kept as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordData {
    A(Ipv4Addr),
    NS { host: String },
    CNAME { host: String },
    MX { priority: u16, host: String },
    AAAA(Ipv6Addr),
    UNKNOWN { rtype: u16, data: Vec<u8> },
}

impl RecordData {
    pub fn record_type(&self) -> QueryType {
        match self {
            RecordData::A(_) => QueryType::A,
            RecordData::NS { .. } => QueryType::NS,
            RecordData::CNAME { .. } => QueryType::CNAME,
            RecordData::MX { .. } => QueryType::MX,
            RecordData::AAAA(_) => QueryType::AAAA,
            RecordData::UNKNOWN { rtype, .. } => QueryType::UNKNOWN(*rtype),
        }
    }

    /// Number of bytes the rdata occupies on the wire.
    pub fn wire_len(&self) -> Result<usize, EncodeError> {
        let len = match self {
            RecordData::A(_) => 4,
            RecordData::NS { host } | RecordData::CNAME { host } => encoded_name_len(host)?,
            RecordData::MX { host, .. } => 2 + encoded_name_len(host)?,
            RecordData::AAAA(_) => 16,
            RecordData::UNKNOWN { data, .. } => data.len(),
        };

        Ok(len)
    }
}

impl From<Ipv4Addr> for RecordData {
    fn from(addr: Ipv4Addr) -> Self {
        RecordData::A(addr)
    }
}

impl From<Ipv6Addr> for RecordData {
    fn from(addr: Ipv6Addr) -> Self {
        RecordData::AAAA(addr)
    }
}

impl DnsMessage {
    /// Starts a message with empty sections. Any counts carried by `header` are reset.
    pub fn new(header: DnsHeader) -> Self {
        let mut message = DnsMessage {
            header,
            questions: vec![],
            answers: vec![],
            authorities: vec![],
            additionals: vec![],
        };
        message.sync_counts();
        message
    }

    pub(crate) fn from_sections(
        header: DnsHeader,
        questions: Vec<DnsQuestion>,
        answers: Vec<DnsRecord>,
        authorities: Vec<DnsRecord>,
        additionals: Vec<DnsRecord>,
    ) -> Self {
        let mut message = DnsMessage {
            header,
            questions,
            answers,
            authorities,
            additionals,
        };
        message.sync_counts();
        message
    }

    pub fn header(&self) -> &DnsHeader {
        &self.header
    }

    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &[DnsRecord] {
        &self.answers
    }

    pub fn authorities(&self) -> &[DnsRecord] {
        &self.authorities
    }

    pub fn additionals(&self) -> &[DnsRecord] {
        &self.additionals
    }

    pub fn add_question(&mut self, question: DnsQuestion) {
        self.questions.push(question);
        self.sync_counts();
    }

    pub fn add_answer(&mut self, record: DnsRecord) {
        self.answers.push(record);
        self.sync_counts();
    }

    pub fn add_authority(&mut self, record: DnsRecord) {
        self.authorities.push(record);
        self.sync_counts();
    }

    pub fn add_additional(&mut self, record: DnsRecord) {
        self.additionals.push(record);
        self.sync_counts();
    }

    pub fn with_question(mut self, question: DnsQuestion) -> Self {
        self.add_question(question);
        self
    }

    pub fn with_answer(mut self, record: DnsRecord) -> Self {
        self.add_answer(record);
        self
    }

    pub fn first_question(&self) -> Option<&DnsQuestion> {
        self.questions.first()
    }

    pub(crate) fn section_lens(&self) -> [(&'static str, usize); 4] {
        [
            ("question", self.questions.len()),
            ("answer", self.answers.len()),
            ("authority", self.authorities.len()),
            ("additional", self.additionals.len()),
        ]
    }

    // Counts saturate here; `to_bytes` refuses sections that do not fit.
    fn sync_counts(&mut self) {
        let count = |len: usize| u16::try_from(len).unwrap_or(u16::MAX);

        self.header.questions = count(self.questions.len());
        self.header.answers = count(self.answers.len());
        self.header.authoritative_entries = count(self.authorities.len());
        self.header.resource_entries = count(self.additionals.len());
    }
}
