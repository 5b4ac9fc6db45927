// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rule extractors (spec §4.2): CSV, XLSX, and PDF-text, sharing an
//! encoding/separator/decimal detection layer and a bilingual header
//! dictionary.

pub mod csv_extractor;
pub mod decimal;
pub mod encoding;
pub mod headers;
pub mod pdf_extractor;
pub mod separator;
pub mod xlsx_extractor;

pub use csv_extractor::extract_csv;
pub use pdf_extractor::{extract_pdf_text, PdfTextResult};
pub use xlsx_extractor::extract_xlsx;
