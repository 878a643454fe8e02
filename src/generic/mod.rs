//! Generic structures with no specific tie to the library, specialised where it helps.

pub mod index_heap;
pub mod luby;
pub mod minimal_pcg;
