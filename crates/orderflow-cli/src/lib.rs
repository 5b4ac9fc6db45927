// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library-level command implementations for the OrderFlow admin CLI,
//! testable without spawning the binary.

pub mod commands;
