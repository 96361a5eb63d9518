pub mod header;
pub mod writer;

pub use header::{WavHeader, HEADER_LEN};
pub use writer::WavWriter;
