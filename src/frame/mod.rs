//! Frame reassembly
//!
//! Turns the producer's chunk stream into complete frames.

pub mod chunk;
pub mod reassembler;

pub use chunk::{Chunk, Frame};
pub use reassembler::{ChunkReassembler, MAX_DATA_BUFFER_SIZE};
