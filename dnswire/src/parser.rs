use std::{
    convert::TryFrom,
    net::{Ipv4Addr, Ipv6Addr},
};

use crate::{
    errors::DecodeError,
    types::{
        DnsHeader, DnsMessage, DnsQuestion, DnsRecord, QueryType, RecordClass, RecordData,
        ResponseCode, MAX_NAME_LEN,
    },
};
use log::trace;
use nom::{
    bytes::complete::take as take_bytes,
    combinator::map,
    error::{ErrorKind, ParseError},
    multi::count,
    number::complete::{be_u128, be_u16, be_u32, be_u8},
    IResult,
};

const LABEL_TYPE_MASK: u8 = 0xc0;
const JUMP_REQUIRED_FLAG: u8 = 0xc0;
const NULL_BYTE: u8 = 0x00;

type ParseResult<'a, O> = IResult<&'a [u8], O, DecodeError>;

impl<'a> ParseError<&'a [u8]> for DecodeError {
    // Only complete byte and number parsers are used, and those fail for lack of input alone.
    fn from_error_kind(input: &'a [u8], _kind: ErrorKind) -> Self {
        DecodeError::UnexpectedEof {
            remaining: input.len(),
        }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn fail<O>(error: DecodeError) -> Result<O, nom::Err<DecodeError>> {
    Err(nom::Err::Failure(error))
}

fn ipv4(input: &[u8]) -> ParseResult<Ipv4Addr> {
    let (rest, bits) = be_u32(input)?;

    Ok((rest, Ipv4Addr::from(bits)))
}

fn ipv6(input: &[u8]) -> ParseResult<Ipv6Addr> {
    let (rest, bits) = be_u128(input)?;

    Ok((rest, Ipv6Addr::from(bits)))
}

fn mail_exchange(input: &[u8]) -> ParseResult<RecordData> {
    let (rest, priority) = be_u16(input)?;
    let (rest, host) = domain_name(rest)?;

    Ok((rest, RecordData::MX { priority, host }))
}

fn label_length(input: &[u8]) -> ParseResult<u8> {
    let (rest, len) = be_u8(input)?;

    match len & LABEL_TYPE_MASK {
        0 => Ok((rest, len)),
        JUMP_REQUIRED_FLAG => fail(DecodeError::CompressionUnsupported),
        _ => fail(DecodeError::InvalidLabelType(len)),
    }
}

/// Walks length prefixed labels up to the zero terminator.
///
/// The root comes back as `.`. Labels holding a `.` byte are refused.
pub fn domain_name(input: &[u8]) -> ParseResult<String> {
    let mut labels = Vec::new();
    let mut encoded_len = 1;
    let mut rest = input;

    loop {
        let (after_len, len) = label_length(rest)?;
        if len == NULL_BYTE {
            rest = after_len;
            break;
        }

        encoded_len += 1 + len as usize;
        if encoded_len > MAX_NAME_LEN {
            return fail(DecodeError::NameTooLong);
        }

        let (after_label, label) = take_bytes(len as usize)(after_len)?;
        if label.contains(&b'.') {
            return fail(DecodeError::DotInLabel(
                String::from_utf8_lossy(label).into_owned(),
            ));
        }
        labels.push(String::from_utf8_lossy(label).into_owned());
        rest = after_label;
    }

    let domain = if labels.is_empty() {
        ".".to_string()
    } else {
        labels.join(".")
    };
    trace!("Result: {}, Remaining: {:x?}", domain, rest);

    Ok((rest, domain))
}

pub fn header(input: &[u8]) -> ParseResult<DnsHeader> {
    // network order is big endian
    let (rest, id) = be_u16(input)?;
    let (rest, flags) = be_u16(rest)?;
    let (rest, questions) = be_u16(rest)?;
    let (rest, answers) = be_u16(rest)?;
    let (rest, authoritative_entries) = be_u16(rest)?;
    let (rest, resource_entries) = be_u16(rest)?;

    let bit = |n: u16| flags & (1 << n) != 0;

    let dns_header = DnsHeader {
        id,

        response: bit(15),
        opcode: ((flags >> 11) & 0x0F) as u8,
        authoritative_answer: bit(10),
        truncated_message: bit(9),
        recursion_desired: bit(8),

        recursion_available: bit(7),
        z: ((flags >> 4) & 0x07) as u8,
        rescode: ResponseCode::from_num((flags & 0x0F) as u8),

        questions,
        answers,
        authoritative_entries,
        resource_entries,
    };

    Ok((rest, dns_header))
}

pub fn question(input: &[u8]) -> ParseResult<DnsQuestion> {
    let (rest, name) = domain_name(input)?;
    let (rest, qtype) = be_u16(rest)?;
    let (rest, qclass) = be_u16(rest)?;

    let question = DnsQuestion {
        name,
        qtype: QueryType::from_num(qtype),
        qclass: RecordClass::from_num(qclass),
    };

    Ok((rest, question))
}

// Typed rdata has to fill the RDLENGTH window exactly.
fn record_data(rtype: u16, rdata: &[u8]) -> Result<RecordData, nom::Err<DecodeError>> {
    let parsed: ParseResult<RecordData> = match QueryType::from_num(rtype) {
        QueryType::A => map(ipv4, RecordData::A)(rdata),
        QueryType::NS => map(domain_name, |host| RecordData::NS { host })(rdata),
        QueryType::CNAME => map(domain_name, |host| RecordData::CNAME { host })(rdata),
        QueryType::MX => mail_exchange(rdata),
        QueryType::AAAA => map(ipv6, RecordData::AAAA)(rdata),
        QueryType::UNKNOWN(_) => Ok((
            &rdata[rdata.len()..],
            RecordData::UNKNOWN {
                rtype,
                data: rdata.to_vec(),
            },
        )),
    };

    let mismatch = DecodeError::RdataLengthMismatch {
        rtype,
        rdlen: rdata.len() as u16,
    };
    match parsed {
        Ok(([], data)) => Ok(data),
        Ok(_) | Err(nom::Err::Error(DecodeError::UnexpectedEof { .. })) => fail(mismatch),
        Err(e) => Err(e),
    }
}

pub fn record(input: &[u8]) -> ParseResult<DnsRecord> {
    let (rest, name) = domain_name(input)?;
    let (rest, rtype) = be_u16(rest)?;
    let (rest, class) = be_u16(rest)?;
    let (rest, ttl) = be_u32(rest)?;
    let (rest, data_len) = be_u16(rest)?;
    let (rest, rdata) = take_bytes(data_len as usize)(rest)?;

    let data = record_data(rtype, rdata)?;
    trace!("Parsed {:?} record for {}", data.record_type(), name);

    let record = DnsRecord {
        name,
        class: RecordClass::from_num(class),
        ttl,
        data,
    };

    Ok((rest, record))
}

pub fn message(input: &[u8]) -> ParseResult<DnsMessage> {
    let (rest, header) = header(input)?;
    let (rest, questions) = count(question, header.questions as usize)(rest)?;
    let (rest, answers) = count(record, header.answers as usize)(rest)?;
    let (rest, authorities) = count(record, header.authoritative_entries as usize)(rest)?;
    let (rest, additionals) = count(record, header.resource_entries as usize)(rest)?;

    let dns_message =
        DnsMessage::from_sections(header, questions, answers, authorities, additionals);

    Ok((rest, dns_message))
}

fn finish<O>(result: ParseResult<O>) -> Result<O, DecodeError> {
    match result {
        Ok(([], value)) => Ok(value),
        Ok((rest, _)) => Err(DecodeError::TrailingBytes(rest.len())),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
        Err(nom::Err::Incomplete(_)) => Err(DecodeError::UnexpectedEof { remaining: 0 }),
    }
}

impl DnsHeader {
    /// Reads the header at the front of `input`. Whatever follows it is ignored.
    pub fn decode(input: &[u8]) -> Result<DnsHeader, DecodeError> {
        let head = &input[..input.len().min(DnsHeader::LEN)];
        finish(header(head))
    }
}

impl DnsMessage {
    /// Decodes a whole message, refusing any bytes after the last section.
    pub fn decode(input: &[u8]) -> Result<DnsMessage, DecodeError> {
        finish(message(input))
    }
}

impl<'a> TryFrom<&'a [u8]> for DnsMessage {
    type Error = DecodeError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        DnsMessage::decode(value)
    }
}

/// Decodes a single encoded name, returning it with the number of bytes it spanned.
pub fn decode_name(input: &[u8]) -> Result<(String, usize), DecodeError> {
    let (rest, name) = match domain_name(input) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
        Err(nom::Err::Incomplete(_)) => return Err(DecodeError::UnexpectedEof { remaining: 0 }),
    };

    Ok((name, input.len() - rest.len()))
}
