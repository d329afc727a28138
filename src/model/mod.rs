//! Core data model: messages, ordered headers, and email addresses.

pub mod address;
pub mod message;
