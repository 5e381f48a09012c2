//! Binary client protocol implementation.
//!
//! This module provides the frame type, its stream codec and the protocol
//! constants shared by every request and response codec.

mod client_message;
mod codec;
pub mod constants;

pub use client_message::{calculate_size_byte_array, calculate_size_str, ClientMessage};
pub use codec::{check_frame_length, ClientMessageCodec, MAX_FRAME_LENGTH};
pub use constants::*;
