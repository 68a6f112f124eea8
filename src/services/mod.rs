//! Services separating file handling and export layouts from edit logic

pub mod format;
pub mod io;

pub use format::MaskFormatHandler;
pub use io::MaskIOService;
