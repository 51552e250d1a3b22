// File: src/cache/mod.rs

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
