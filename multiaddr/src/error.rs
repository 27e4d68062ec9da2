use std::net;
use std::num::ParseIntError;
use std::str;
use thiserror::Error;

/// Errors produced when parsing or building a [`crate::Multiaddr`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid multiaddr")]
    InvalidMultiaddr,
    #[error("invalid protocol string")]
    InvalidProtocolString,
    #[error("unknown protocol string: {0}")]
    UnknownProtocolString(String),
    #[error("unknown protocol id: {0}")]
    UnknownProtocolId(u32),
    #[error("insufficient data in buffer")]
    DataLessThanLen,
    #[error("invalid uvarint")]
    Varint(#[from] unsigned_varint::decode::Error),
    #[error(transparent)]
    ParseError(#[from] ParseIntError),
    #[error(transparent)]
    AddrParseError(#[from] net::AddrParseError),
    #[error(transparent)]
    Utf8Error(#[from] str::Utf8Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    MultihashError(#[from] multihash::DecodeOwnedError),
    #[error(transparent)]
    Bs58DecodeError(#[from] bs58::decode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
