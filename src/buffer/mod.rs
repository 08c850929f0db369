//! Host-side pixel marshalling between `HostImage` and `PackedBuffer`.

pub mod adapter;

pub use adapter::PixelBufferAdapter;
