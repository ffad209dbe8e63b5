//! Transport layer for the DNS proxy.
//!
//! Queries arrive and leave over UDP only; the blocked-answer scheme
//! relies on echoing datagrams, so there is no TCP listener.

pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;
