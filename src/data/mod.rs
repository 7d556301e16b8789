//! Observed-data handling: holder descriptions, the in-memory spectrum and
//! the file readers.

pub mod holder;
pub mod reader;
pub mod spectrum;

pub use holder::SfsDataHolder;
pub use reader::read_sfs;
pub use spectrum::Spectrum;
