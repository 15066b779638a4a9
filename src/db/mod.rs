// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer (in-process).
//!
//! All services receive a [`MemoryDb`] handle at construction time; nothing
//! is stored in globals, so every test can build an isolated instance.

pub mod memory;

pub use memory::MemoryDb;
