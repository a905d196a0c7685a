//! Session storage adapters

mod file;
mod memory;

pub use file::FileSessionStorage;
pub use memory::MemorySessionStorage;
