mod command;
mod encoder;
mod primitive;
mod settings;
mod status;

pub use command::{CommandChunk, EncodedCommand};
pub use encoder::{CommandEncoder, EncoderFactory, LabelEncoder};
pub use primitive::{
    Alignment, BarcodeSymbology, CutMode, DEFAULT_BARCODE_HEIGHT, DEFAULT_BARCODE_WIDTH,
    DEFAULT_QR_SIZE, FeedDirection, PrintPrimitive, QrErrorLevel, TextFormat, raster_row_bytes,
    validate_raster,
};
pub use settings::{
    DARKNESS_RANGE, PrinterSettings, SPEED_RANGE, SessionConfig, validate_darkness,
    validate_speed,
};
pub use status::{JobStatus, PrinterStatus};
