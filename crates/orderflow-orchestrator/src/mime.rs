//! Mime-type dispatch table for the rule extractors (spec §4.4 step 1-2).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Csv,
    Xlsx,
    Pdf,
    Unsupported,
}

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn classify(mime_type: &str) -> DocumentKind {
    match mime_type {
        "text/csv" | "application/csv" | "application/vnd.ms-excel" => DocumentKind::Csv,
        m if m == XLSX_MIME => DocumentKind::Xlsx,
        "application/pdf" => DocumentKind::Pdf,
        _ => DocumentKind::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_mime_types() {
        assert_eq!(classify("text/csv"), DocumentKind::Csv);
        assert_eq!(classify(XLSX_MIME), DocumentKind::Xlsx);
        assert_eq!(classify("application/pdf"), DocumentKind::Pdf);
    }

    #[test]
    fn unknown_mime_is_unsupported() {
        assert_eq!(classify("image/png"), DocumentKind::Unsupported);
    }
}
