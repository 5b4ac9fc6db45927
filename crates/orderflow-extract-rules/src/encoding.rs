//! Encoding detection with ordered fallback UTF-8 -> ISO-8859-1 ->
//! Windows-1252 (spec §4.2(a)).

/// Bytes decoded to text plus the encoding label actually used.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode raw file bytes to text. Strict UTF-8 is tried first; if that
/// fails, `chardetng` votes on the remaining two candidates and we decode
/// with whichever it names, defaulting to ISO-8859-1 (never errors, every
/// byte maps to a codepoint) unless the detector is confident about
/// Windows-1252.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: s.to_string(),
            encoding: "UTF-8",
        };
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(None, true);

    if guessed == encoding_rs::WINDOWS_1252 {
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        return DecodedText {
            text: text.into_owned(),
            encoding: "windows-1252",
        };
    }

    let (text, _, _) = encoding_rs::ISO_8859_1.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding: "iso-8859-1",
    }
}
