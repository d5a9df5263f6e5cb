use crate::native::NativeHandle;

/// Errors reported to callers of the tray API.
#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("icon conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("native call `{call}` failed: {source}")]
    NativeCall {
        call: &'static str,
        #[source]
        source: NativeError,
    },

    #[error("{0} is unsupported on this platform")]
    Unsupported(&'static str),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("menu tag space exhausted")]
    TagsExhausted,
}

impl TrayError {
    pub fn native(call: &'static str, source: NativeError) -> Self {
        TrayError::NativeCall { call, source }
    }
}

/// Failures turning an icon into the status bar's pixel layout.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("unsupported color model: {0}")]
    UnsupportedColorModel(String),

    #[error("image too large to rasterize ({width}x{height})")]
    TooLarge { width: u32, height: u32 },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Failures reported by a [`StatusBar`](crate::native::StatusBar) implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    #[error("native status bar is not running")]
    Unavailable,

    #[error("unknown native handle {0:?}")]
    InvalidHandle(NativeHandle),

    #[error("menu index {index} out of range for {count} entries")]
    MenuIndex { index: usize, count: usize },

    #[error("{0}")]
    Backend(String),
}
