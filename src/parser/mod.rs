//! Message parsing: EML parsing, header decoding, and transfer-encoding
//! handling.

pub mod eml;
pub mod header;
pub mod transfer;
