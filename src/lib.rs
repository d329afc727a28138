//! `mboxmend` — repair a migrated personal email archive.
//!
//! Four independently invocable stages, each reading the previous stage's
//! output and writing a fresh location:
//!
//! 1. [`split`] — break an mbox file into individual `.eml` files
//! 2. [`datefix`] — recover a trustworthy date per message and rebuild it
//!    with a standardized header set
//! 3. [`dedup`] — drop duplicate messages, keeping the cleanest copy
//! 4. [`assemble`] — reassemble the survivors into a single mbox file

pub mod assemble;
pub mod datefix;
pub mod dedup;
pub mod error;
pub mod model;
pub mod outdir;
pub mod parser;
pub mod split;
