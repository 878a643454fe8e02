//! Miscellaneous items, unlikely to be of interest unless extending the library.

pub mod log;
