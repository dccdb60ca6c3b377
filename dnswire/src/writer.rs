use log::trace;
use std::convert::TryFrom;

use crate::{
    errors::EncodeError,
    types::{
        DnsHeader, DnsMessage, DnsQuestion, DnsRecord, RecordData, MAX_LABEL_LEN, MAX_NAME_LEN,
    },
};

/// Typical size of a UDP message, used to size the output up front.
const UDP_MESSAGE_SIZE: usize = 512;

struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn with_capacity(capacity: usize) -> WireWriter {
        WireWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn pos(&self) -> usize {
        self.buf.len()
    }

    fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    fn write_u16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    fn write_u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn write_qname(&mut self, qname: &str) -> Result<(), EncodeError> {
        for label in labels(qname)? {
            // `labels` caps every label at 63 bytes
            self.write_u8(label.len() as u8);
            self.write_bytes(label.as_bytes());
        }

        self.write_u8(0);

        Ok(())
    }

    fn set_u16(&mut self, pos: usize, val: u16) {
        self.buf[pos..pos + 2].copy_from_slice(&val.to_be_bytes());
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Splits a dotted name into the labels that go on the wire.
///
/// A single trailing dot is accepted, so `example.com.` and `example.com` encode the same.
fn labels(name: &str) -> Result<Vec<&str>, EncodeError> {
    let relative = name.strip_suffix('.').unwrap_or(name);
    if relative.is_empty() {
        return Err(EncodeError::NameEmpty);
    }

    let labels: Vec<&str> = relative.split('.').collect();
    let mut encoded_len = 1;
    for label in &labels {
        if label.is_empty() {
            return Err(EncodeError::EmptyLabel(name.to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(EncodeError::LabelTooLong {
                label: label.to_string(),
                len: label.len(),
            });
        }
        encoded_len += 1 + label.len();
    }

    if encoded_len > MAX_NAME_LEN {
        return Err(EncodeError::NameTooLong {
            name: name.to_string(),
            len: encoded_len,
        });
    }

    Ok(labels)
}

pub(crate) fn encoded_name_len(name: &str) -> Result<usize, EncodeError> {
    let len = labels(name)?.iter().map(|label| 1 + label.len()).sum::<usize>() + 1;

    Ok(len)
}

/// Encodes a dotted name as length prefixed labels followed by a zero byte.
pub fn encode_name(name: &str) -> Result<Vec<u8>, EncodeError> {
    let mut writer = WireWriter::with_capacity(name.len() + 2);
    writer.write_qname(name)?;

    Ok(writer.into_bytes())
}

impl DnsHeader {
    pub fn to_bytes(&self) -> [u8; DnsHeader::LEN] {
        let mut bytes = [0u8; DnsHeader::LEN];
        let words = [
            self.id,
            self.flags(),
            self.questions,
            self.answers,
            self.authoritative_entries,
            self.resource_entries,
        ];

        for (chunk, word) in bytes.chunks_exact_mut(2).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }

        bytes
    }
}

impl DnsQuestion {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut writer = WireWriter::with_capacity(self.name.len() + 6);
        write_question(self, &mut writer)?;

        Ok(writer.into_bytes())
    }
}

impl DnsRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut writer = WireWriter::with_capacity(self.name.len() + 16);
        write_record(self, &mut writer)?;

        Ok(writer.into_bytes())
    }
}

impl DnsMessage {
    /// Serializes the header followed by every section in wire order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        for &(section, len) in self.section_lens().iter() {
            if len > u16::MAX as usize {
                return Err(EncodeError::SectionTooLarge { section, len });
            }
        }

        let mut writer = WireWriter::with_capacity(UDP_MESSAGE_SIZE);
        writer.write_bytes(&self.header().to_bytes());

        for question in self.questions() {
            write_question(question, &mut writer)?;
        }

        let sections = [self.answers(), self.authorities(), self.additionals()];
        for rec in sections.iter().flat_map(|section| section.iter()) {
            write_record(rec, &mut writer)?;
        }

        trace!("Encoded message of {} bytes", writer.pos());

        Ok(writer.into_bytes())
    }
}

fn write_question(question: &DnsQuestion, writer: &mut WireWriter) -> Result<(), EncodeError> {
    writer.write_qname(&question.name)?;
    writer.write_u16(question.qtype.to_num());
    writer.write_u16(question.qclass.to_num());

    Ok(())
}

fn write_record(record: &DnsRecord, writer: &mut WireWriter) -> Result<usize, EncodeError> {
    let start_pos = writer.pos();

    // EDNS OPT records are owned by the root
    if record.name == "." {
        writer.write_u8(0);
    } else {
        writer.write_qname(&record.name)?;
    }
    writer.write_u16(record.rtype().to_num());
    writer.write_u16(record.class.to_num());
    writer.write_u32(record.ttl);

    let len_pos = writer.pos();
    writer.write_u16(0);

    match record.data {
        RecordData::A(ref addr) => writer.write_bytes(&addr.octets()),
        RecordData::NS { ref host } | RecordData::CNAME { ref host } => {
            writer.write_qname(host)?
        }
        RecordData::MX { priority, ref host } => {
            writer.write_u16(priority);
            writer.write_qname(host)?;
        }
        RecordData::AAAA(ref addr) => writer.write_bytes(&addr.octets()),
        RecordData::UNKNOWN { ref data, .. } => writer.write_bytes(data),
    }

    let size = writer.pos() - (len_pos + 2);
    let rdlen = u16::try_from(size).map_err(|_| EncodeError::RdataTooLong(size))?;
    writer.set_u16(len_pos, rdlen);
    trace!("Wrote {:?} record for {} with {} bytes of rdata", record.rtype(), record.name, rdlen);

    Ok(writer.pos() - start_pos)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::net::{Ipv4Addr, Ipv6Addr};

    use crate::types::{QueryType, RecordClass, ResponseCode};

    use super::*;

    #[rustfmt::skip]
    fn codecrafters_answer() -> [u8; 64] {
        [
            0x04, 0xd2, // identifier
            0x80, 0x00, // flags
            0x00, 0x01, // question count
            0x00, 0x01, // answer count
            0x00, 0x00, // authority count
            0x00, 0x00, // additional count
            0x0c, b'c', b'o', b'd', b'e', b'c', b'r', b'a', b'f', b't', b'e', b'r', b's',
            0x02, b'i', b'o', 0x00, // codecrafters.io
            0x00, 0x01, // query type
            0x00, 0x01, // query class
            // Repeated in full, there is no compression
            0x0c, b'c', b'o', b'd', b'e', b'c', b'r', b'a', b'f', b't', b'e', b'r', b's',
            0x02, b'i', b'o', 0x00, // codecrafters.io
            0x00, 0x01, // type
            0x00, 0x01, // class
            0x00, 0x00, 0x00, 0x3c, // ttl
            0x00, 0x04, // len
            0x08, 0x08, 0x08, 0x08, // ip
        ]
    }

    fn codecrafters_message() -> DnsMessage {
        let header = DnsHeader::builder().id(1234).response(true).build();

        let mut message = DnsMessage::new(header);
        message.add_question(DnsQuestion::new("codecrafters.io", QueryType::A));
        message.add_answer(DnsRecord::new(
            "codecrafters.io",
            60,
            RecordData::A(Ipv4Addr::from(0x0808_0808u32)),
        ));
        message
    }

    #[test]
    fn header_writing_works() {
        let header = DnsHeader::builder().id(1234).response(true).build();

        assert_eq!(
            header.to_bytes(),
            [0x04, 0xd2, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn header_writes_counts_in_order() {
        let header = DnsHeader::builder()
            .id(0xa84f)
            .recursion_desired(true)
            .rescode(ResponseCode::SERVFAIL)
            .questions(1)
            .answers(2)
            .authoritative_entries(3)
            .resource_entries(4)
            .build();

        assert_eq!(
            header.to_bytes(),
            [0xa8, 0x4f, 0x01, 0x02, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04]
        );
    }

    #[test]
    fn name_writing_works() {
        let bytes = encode_name("codecrafters.io").unwrap();

        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes, b"\x0ccodecrafters\x02io\x00".to_vec());
    }

    #[test]
    fn trailing_dot_is_ignored() {
        assert_eq!(
            encode_name("codecrafters.io.").unwrap(),
            encode_name("codecrafters.io").unwrap()
        );
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert_eq!(encode_name(""), Err(EncodeError::NameEmpty));
        assert_eq!(encode_name("."), Err(EncodeError::NameEmpty));
        assert_eq!(
            encode_name("a..b"),
            Err(EncodeError::EmptyLabel("a..b".to_string()))
        );

        let long_label = "x".repeat(64);
        assert_eq!(
            encode_name(&format!("{}.com", long_label)),
            Err(EncodeError::LabelTooLong {
                label: long_label,
                len: 64
            })
        );
        assert!(encode_name(&format!("{}.com", "x".repeat(63))).is_ok());

        // four 63 byte labels encode to 257 bytes
        let long_name = vec!["y".repeat(63); 4].join(".");
        assert_eq!(
            encode_name(&long_name),
            Err(EncodeError::NameTooLong {
                name: long_name.clone(),
                len: 257
            })
        );
    }

    #[test]
    fn question_writing_works() {
        let question = DnsQuestion {
            name: "google.com".to_string(),
            qtype: QueryType::AAAA,
            qclass: RecordClass::CH,
        };

        assert_eq!(
            question.to_bytes().unwrap(),
            b"\x06google\x03com\x00\x00\x1c\x00\x03".to_vec()
        );
    }

    #[test]
    fn a_record_always_carries_four_bytes() {
        let record = DnsRecord::new("io", 300, RecordData::A(Ipv4Addr::new(1, 2, 3, 4)));

        assert_eq!(
            record.to_bytes().unwrap(),
            vec![
                0x02, b'i', b'o', 0x00, // name
                0x00, 0x01, 0x00, 0x01, // type, class
                0x00, 0x00, 0x01, 0x2c, // ttl
                0x00, 0x04, 1, 2, 3, 4, // rdata
            ]
        );
    }

    #[test]
    fn name_rdata_length_is_backpatched() {
        let record = DnsRecord::new(
            "io",
            1,
            RecordData::MX {
                priority: 10,
                host: "mx.io".to_string(),
            },
        );
        let bytes = record.to_bytes().unwrap();

        // 2 byte priority + 02 "mx" 02 "io" 00
        assert_eq!(&bytes[12..14], &[0x00, 0x09]);
        assert_eq!(&bytes[14..], b"\x00\x0a\x02mx\x02io\x00");
    }

    #[test]
    fn aaaa_and_opaque_rdata_are_written_verbatim() {
        let aaaa = DnsRecord::new("io", 1, RecordData::AAAA(Ipv6Addr::LOCALHOST));
        let bytes = aaaa.to_bytes().unwrap();
        assert_eq!(&bytes[4..6], &[0x00, 0x1c]);
        assert_eq!(&bytes[12..14], &[0x00, 0x10]);
        assert_eq!(bytes[bytes.len() - 1], 1);

        let txt = DnsRecord::new(
            "io",
            1,
            RecordData::UNKNOWN {
                rtype: 16,
                data: b"\x02hi".to_vec(),
            },
        );
        assert_eq!(
            &txt.to_bytes().unwrap()[4..],
            b"\x00\x10\x00\x01\x00\x00\x00\x01\x00\x03\x02hi"
        );
    }

    #[test]
    fn root_owned_record_starts_with_a_zero() {
        let opt = DnsRecord {
            name: ".".to_string(),
            class: RecordClass::UNKNOWN(4096),
            ttl: 0,
            data: RecordData::UNKNOWN {
                rtype: 41,
                data: Vec::new(),
            },
        };

        #[rustfmt::skip]
        let expected = vec![
            0x00, // root
            0x00, 0x29, 0x10, 0x00, // type OPT, udp payload size
            0x00, 0x00, 0x00, 0x00, // ttl
            0x00, 0x00, // len
        ];

        assert_eq!(opt.to_bytes().unwrap(), expected);
    }

    #[test]
    fn record_with_invalid_host_fails() {
        let record = DnsRecord::new(
            "io",
            1,
            RecordData::CNAME {
                host: "bad..host".to_string(),
            },
        );

        assert_eq!(
            record.to_bytes(),
            Err(EncodeError::EmptyLabel("bad..host".to_string()))
        );
    }

    #[test]
    fn oversized_opaque_rdata_fails() {
        let record = DnsRecord::new(
            "io",
            1,
            RecordData::UNKNOWN {
                rtype: 99,
                data: vec![0; 70_000],
            },
        );

        assert_eq!(record.to_bytes(), Err(EncodeError::RdataTooLong(70_000)));
    }

    #[test]
    fn message_writing_works() {
        let bytes = codecrafters_message().to_bytes().unwrap();

        assert_eq!(bytes, codecrafters_answer().to_vec());
    }

    #[test]
    fn message_writing_is_idempotent() {
        let message = codecrafters_message();

        assert_eq!(message.to_bytes().unwrap(), message.to_bytes().unwrap());
    }

    #[test]
    fn sections_are_written_in_wire_order() {
        let mut message = DnsMessage::new(DnsHeader::builder().id(9).build());
        message.add_additional(DnsRecord::new("c", 1, RecordData::A(Ipv4Addr::new(0, 0, 0, 3))));
        message.add_authority(DnsRecord::new("b", 1, RecordData::A(Ipv4Addr::new(0, 0, 0, 2))));
        message.add_answer(DnsRecord::new("a", 1, RecordData::A(Ipv4Addr::new(0, 0, 0, 1))));

        let bytes = message.to_bytes().unwrap();
        // each record is 3 + 10 + 4 bytes
        assert_eq!(&bytes[6..12], &[0x00, 0x01, 0x00, 0x01, 0x00, 0x01]);
        assert_eq!(bytes[13], b'a');
        assert_eq!(bytes[12 + 17 + 1], b'b');
        assert_eq!(bytes[12 + 34 + 1], b'c');
        assert_eq!(bytes.len(), 12 + 51);
    }

    #[test]
    fn empty_question_name_fails_message() {
        let mut message = DnsMessage::new(DnsHeader::builder().id(9).build());
        message.add_question(DnsQuestion::new("", QueryType::A));

        assert_eq!(message.to_bytes(), Err(EncodeError::NameEmpty));
    }

    #[test]
    fn oversized_section_is_refused() {
        let mut message = DnsMessage::new(DnsHeader::builder().id(9).build());
        for _ in 0..=u16::MAX as usize {
            message.add_question(DnsQuestion::new("a", QueryType::A));
        }

        assert_eq!(message.header().questions, u16::MAX);
        assert_eq!(
            message.to_bytes(),
            Err(EncodeError::SectionTooLarge {
                section: "question",
                len: 65536
            })
        );
    }
}
