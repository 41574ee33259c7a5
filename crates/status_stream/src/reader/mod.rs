mod record;
mod scan;

pub use record::{RawRecord, RecordReader};
