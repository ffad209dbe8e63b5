//! Sinkhole - a transparent DNS interception proxy.
//!
//! Sits between stub resolvers and a real upstream: queries for blocked
//! domains are answered with a forged A record pointing at the proxy
//! itself, everything else is relayed verbatim. An HTTP side-channel
//! absorbs the resulting stray requests with a tracking pixel and
//! exposes a small authenticated control surface.

pub mod control;
pub mod dns;
pub mod filter;
pub mod pending;
pub mod proxy;
pub mod stats;
pub mod transport;
