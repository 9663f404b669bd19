//! Run modes of `encd`.

pub mod serve;
pub mod transfer;
