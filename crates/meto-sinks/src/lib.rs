//! Output sinks turning tables and documents into downloadable bytes

#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "xlsx")]
pub mod xlsx;

#[cfg(feature = "pdf")]
pub use pdf::PdfSink;
#[cfg(feature = "xlsx")]
pub use xlsx::XlsxSink;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
