//! Hashing primitives for the genome data API.
//!
//! Provides domain-separated BLAKE3 hashing used to canonicalise type
//! schemas, and the MD5 and composition helpers used to check sequences
//! against the checksums stored alongside them.

pub mod hasher;
pub mod sequence;

pub use hasher::{ContentHasher, HasherError};
pub use sequence::{gc_content, sequence_md5, strip_whitespace, verify_sequence_md5};
