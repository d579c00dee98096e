//! Byte-level encoding of the packets the command engine sends to clients.

pub mod packets;

pub use packets::{PacketDecoderExt, PacketEncoder, PacketEncoderExt};
