// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use thiserror::Error;

/// Error taxonomy surfaced by the channel engine.
///
/// `Invalid`/`NotFound`/`Empty`/`OutOfOrderTime`/`ReadOnly` never set the
/// sticky failure flag on a [`crate::channel::Channel`]; everything else does.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index not found")]
    NotFound,

    #[error("channel has no segments")]
    Empty,

    #[error("channel is read-only")]
    ReadOnly,

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("out-of-order timestamp: record time must exceed the current tail's end time")]
    OutOfOrderTime,

    #[error("channel is full: {0}")]
    Full(String),

    #[error("corrupt on-disk format: {0}")]
    CorruptFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel has entered the sticky failure state")]
    Failed,
}

pub type Result<T> = std::result::Result<T, StoreError>;
