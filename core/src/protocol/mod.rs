//! Wire protocol: constants and the message codec

pub mod codec;
pub mod constants;

pub use codec::{decode, encode, WireMessage};
