//! The closed unit-of-measure vocabulary (spec §3).

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical units of measure. Closed set used for extraction validation,
/// matching's UoM penalty, and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Uom {
    /// Piece / Stück.
    St,
    /// Meter.
    M,
    /// Centimeter.
    Cm,
    /// Millimeter.
    Mm,
    /// Kilogram.
    Kg,
    /// Gram.
    G,
    /// Liter.
    L,
    /// Milliliter.
    Ml,
    /// Carton / Karton.
    Kar,
    /// Pallet.
    Pal,
    /// Set.
    Set,
}

impl Uom {
    pub const ALL: [Uom; 11] = [
        Uom::St,
        Uom::M,
        Uom::Cm,
        Uom::Mm,
        Uom::Kg,
        Uom::G,
        Uom::L,
        Uom::Ml,
        Uom::Kar,
        Uom::Pal,
        Uom::Set,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Uom::St => "ST",
            Uom::M => "M",
            Uom::Cm => "CM",
            Uom::Mm => "MM",
            Uom::Kg => "KG",
            Uom::G => "G",
            Uom::L => "L",
            Uom::Ml => "ML",
            Uom::Kar => "KAR",
            Uom::Pal => "PAL",
            Uom::Set => "SET",
        }
    }
}

impl fmt::Display for Uom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token does not map to the canonical vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUom(pub String);

impl fmt::Display for UnknownUom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown UoM token: {}", self.0)
    }
}

impl std::error::Error for UnknownUom {}

impl FromStr for Uom {
    type Err = UnknownUom;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "ST" | "STK" | "STÜCK" | "STUECK" | "PC" | "PCS" | "EA" | "EACH" => Ok(Uom::St),
            "M" | "MTR" | "METER" => Ok(Uom::M),
            "CM" => Ok(Uom::Cm),
            "MM" => Ok(Uom::Mm),
            "KG" | "KILO" | "KILOGRAM" => Ok(Uom::Kg),
            "G" | "GR" | "GRAM" => Ok(Uom::G),
            "L" | "LTR" | "LITER" | "LITRE" => Ok(Uom::L),
            "ML" => Ok(Uom::Ml),
            "KAR" | "KARTON" | "CARTON" | "CTN" => Ok(Uom::Kar),
            "PAL" | "PALETTE" | "PALLET" => Ok(Uom::Pal),
            "SET" => Ok(Uom::Set),
            _ => Err(UnknownUom(s.to_string())),
        }
    }
}
