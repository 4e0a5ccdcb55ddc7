//! Image-to-Speech Reader: OCR an image and read the text aloud through a
//! cloud speech service or, when offline, the host speech engine.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod ocr;
pub mod speech;
