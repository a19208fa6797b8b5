/// Device descriptors
mod types;

pub use self::types::{*};

/// The name lookup table the interpreter reads from
pub mod table;

pub use self::table::DeviceTable;
