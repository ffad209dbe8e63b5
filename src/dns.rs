//! DNS wire format handling.
//!
//! Decodes the question section of a raw query and builds forged answers
//! for blocked domains. Only single-question messages are supported;
//! compression pointers are never produced by stub resolvers in queries
//! and are not handled.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Length of the fixed DNS header.
pub const HEADER_LEN: usize = 12;

/// Reasons a query can be rejected by [`Question::parse`].
///
/// All variants mean the datagram is dropped without a response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The header advertises a question count other than one.
    #[error("unsupported question count {0}")]
    UnsupportedQuestionCount(u8),
    /// The message ends before the question section does.
    #[error("message truncated inside the question section")]
    Truncated,
    /// A label contains bytes that are not valid UTF-8.
    #[error("question label is not valid UTF-8")]
    InvalidLabel,
}

/// The parsed question of a DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Transaction ID from header bytes 0-1.
    pub id: u16,
    /// Queried domain, lowercase, one trailing dot (`"ads.example.com."`).
    ///
    /// The trailing dot keeps suffix matching honest: `"evil.com."` can
    /// never match a block entry `"vil.com."`.
    pub host: String,
    /// Wire length of the QNAME (length prefixes + labels + terminator),
    /// so the question name occupies bytes `[12, 12 + qname_len)`.
    pub qname_len: usize,
}

impl Question {
    /// Parse the question section of a raw DNS query.
    ///
    /// Reads the transaction ID, checks the question count (byte 5 - the
    /// supported case never exceeds 255), and walks the length-prefixed
    /// QNAME labels at offset 12. A length byte >= 0xC0 would be a
    /// compression pointer; it is treated as a plain length here and
    /// fails the bounds check instead of being followed.
    pub fn parse(msg: &[u8]) -> Result<Self, ParseError> {
        if msg.len() < HEADER_LEN + 1 {
            return Err(ParseError::Truncated);
        }

        let id = u16::from_be_bytes([msg[0], msg[1]]);

        let qdcount = msg[5];
        if qdcount != 1 {
            return Err(ParseError::UnsupportedQuestionCount(qdcount));
        }

        let mut host = String::new();
        let mut pos = HEADER_LEN;

        loop {
            let label_len = *msg.get(pos).ok_or(ParseError::Truncated)? as usize;
            pos += 1;
            if label_len == 0 {
                break;
            }
            let label = msg
                .get(pos..pos + label_len)
                .ok_or(ParseError::Truncated)?;
            let label = std::str::from_utf8(label).map_err(|_| ParseError::InvalidLabel)?;
            for c in label.chars() {
                host.push(c.to_ascii_lowercase());
            }
            host.push('.');
            pos += label_len;
        }

        // QTYPE + QCLASS must still fit.
        if pos + 4 > msg.len() {
            return Err(ParseError::Truncated);
        }

        Ok(Self {
            id,
            host,
            qname_len: pos - HEADER_LEN,
        })
    }
}

/// Precomputed tail of every forged answer record.
///
/// `TYPE=A, CLASS=IN, TTL=0xFFFFFFFF, RDLENGTH=4, RDATA=<proxy IPv4>`.
/// The maximal TTL asks well-behaved clients to cache the sinkhole
/// address and stop re-asking. Built once at startup, immutable after.
#[derive(Debug, Clone, Copy)]
pub struct AnswerTemplate([u8; Self::LEN]);

impl AnswerTemplate {
    /// Wire length of the template.
    pub const LEN: usize = 14;

    /// Build the template for the given sinkhole address.
    pub fn new(addr: Ipv4Addr) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes[..10].copy_from_slice(&[
            0x00, 0x01, // TYPE = A
            0x00, 0x01, // CLASS = IN
            0xff, 0xff, 0xff, 0xff, // TTL
            0x00, 0x04, // RDLENGTH
        ]);
        bytes[10..].copy_from_slice(&addr.octets());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Forge a blocked-domain response from the original query bytes.
///
/// The header and QNAME are echoed byte-exact (same transaction ID, so
/// any stub resolver correlates it), with the flags rewritten to a
/// recursive answer (`0x81 0x80`) and ANCOUNT set to one. The answer
/// record repeats the QNAME uncompressed and appends the template.
/// The result is always `2 * qname_len + 26` bytes.
pub fn forge_block_response(
    msg: &[u8],
    question: &Question,
    template: &AnswerTemplate,
) -> Vec<u8> {
    let question_end = HEADER_LEN + question.qname_len;

    let mut response =
        Vec::with_capacity(question_end + question.qname_len + AnswerTemplate::LEN);
    response.extend_from_slice(&msg[..question_end]);
    response[2] = 0x81; // QR=1, opcode 0, RD=1
    response[3] = 0x80; // RA=1
    response[7] = 1; // ANCOUNT low byte
    response.extend_from_slice(&msg[HEADER_LEN..question_end]);
    response.extend_from_slice(template.as_bytes());
    response
}

#[cfg(test)]
pub(crate) mod testutil {
    /// Build a well-formed single-question A query for `host`.
    pub(crate) fn build_query(id: u16, host: &str) -> Vec<u8> {
        let mut msg = Vec::new();
        msg.extend_from_slice(&id.to_be_bytes());
        msg.extend_from_slice(&[0x01, 0x00]); // RD=1
        msg.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
        msg.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        for label in host.split('.').filter(|l| !l.is_empty()) {
            msg.push(label.len() as u8);
            msg.extend_from_slice(label.as_bytes());
        }
        msg.push(0);
        msg.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]); // QTYPE A, QCLASS IN
        msg
    }
}
