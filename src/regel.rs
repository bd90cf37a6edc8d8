//! # REGEL Records
//!
//! The order system sends one label per connection as a fixed-width text
//! record (a "REGEL"). Fields sit at fixed character positions; most are
//! padded with spaces, some carry NUL bytes.
//!
//! ## Layout (character offsets, end exclusive)
//!
//! | Range | Field | Range | Field |
//! |-------|-------|-------|-------|
//! | 0–1 | `TYPE` | 127–129 | `RGT` |
//! | 1–8 | `DATUM` | 129–146 | `CODER` |
//! | 8–12 | `KLANTNR` | 146–230 | right lens block |
//! | 12–19 | `BONNR` | 230–232 | `LFT` |
//! | 19–31 | `REFER` | 232–249 | `CODEL` |
//! | 31–46 | `NAAM` | 249–333 | left lens block |
//! | 46–66 | `SUBNAAM` | 333–347 | `DI` |
//! | 66–127 | material, Dk, text | 347–367 | `UDI` |
//!
//! The full table is [`FIELDS`].

use crate::values::ValueMap;

/// `(name, start, end)` in record order.
pub const FIELDS: &[(&str, usize, usize)] = &[
    ("TYPE", 0, 1),
    ("DATUM", 1, 8),
    ("KLANTNR", 8, 12),
    ("BONNR", 12, 19),
    ("REFER", 19, 31),
    ("NAAM", 31, 46),
    ("SUBNAAM", 46, 66),
    ("MATLBL", 66, 70),
    ("MAT", 70, 85),
    ("DKLBL", 85, 89),
    ("DK", 89, 92),
    ("TEKST", 92, 127),
    ("RGT", 127, 129),
    ("CODER", 129, 146),
    ("DIARLBL", 146, 150),
    ("DIAR", 150, 154),
    ("EXCRLBL", 154, 158),
    ("EXCR", 158, 162),
    ("RADRLBL", 162, 166),
    ("RADR", 166, 170),
    ("DPTRLBL", 170, 174),
    ("DPTR", 174, 180),
    ("CYLRLBL", 180, 184),
    ("CYLR", 184, 189),
    ("XASRLBL", 189, 193),
    ("XASR", 193, 196),
    ("SAGRLBL", 196, 200),
    ("SAGR", 200, 205),
    ("PERIFRLBL", 205, 209),
    ("PERIFR", 209, 214),
    ("DRAD2RLBL", 214, 218),
    ("DRAD2R", 218, 222),
    ("IDR", 222, 230),
    ("LFT", 230, 232),
    ("CODEL", 232, 249),
    ("DIALLBL", 249, 253),
    ("DIAL", 253, 257),
    ("EXCLLBL", 257, 261),
    ("EXCL", 261, 265),
    ("RADLLBL", 265, 269),
    ("RADL", 269, 273),
    ("DPTLLBL", 273, 277),
    ("DPTL", 277, 283),
    ("CYLLLBL", 283, 287),
    ("CYLL", 287, 292),
    ("XASLLBL", 292, 296),
    ("XASL", 296, 299),
    ("SAGLLBL", 299, 303),
    ("SAGL", 303, 308),
    ("PERIFLLBL", 308, 312),
    ("PERIFL", 312, 317),
    ("DRAD2LLBL", 317, 321),
    ("DRAD2L", 321, 325),
    ("IDL", 325, 333),
    ("DI", 333, 347),
    ("UDI", 347, 367),
];

/// A record must be longer than this to carry a UDI.
const UDI_MIN_LEN: usize = 367;

/// Characters trimmed from both ends of a raw record.
const FRAME_CHARS: &[char] = &[' ', '=', '#', '&', '\r', '\n'];

/// Valid record type markers.
const RECORD_TYPES: &str = "=#STHMPJKBZ";

/// Field names in record order (CSV column order).
pub fn field_names() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|(name, _, _)| *name)
}

/// Quick plausibility check before parsing.
pub fn is_valid_regel(data: &str) -> bool {
    let data = data.trim();
    match data.chars().next() {
        Some(first) => data.chars().count() >= 50 && RECORD_TYPES.contains(first),
        None => false,
    }
}

/// Slice a record into named fields.
///
/// Slices past the end of the record are empty. Every field is trimmed and
/// stripped of NUL characters.
pub fn parse_regel(regel: &str) -> ValueMap {
    let chars: Vec<char> = regel.trim_matches(FRAME_CHARS).chars().collect();

    FIELDS
        .iter()
        .map(|&(name, start, end)| {
            let value = if name == "UDI" && chars.len() <= UDI_MIN_LEN {
                String::new()
            } else {
                slice(&chars, start, end)
            };
            (name.to_string(), value)
        })
        .collect()
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end]
        .iter()
        .filter(|&&c| c != '\0')
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a record by placing values at their field offsets.
    pub(crate) fn record(fields: &[(&str, &str)], len: usize) -> String {
        let mut chars = vec![' '; len];
        for (name, value) in fields {
            let &(_, start, _) = FIELDS
                .iter()
                .find(|(n, _, _)| n == name)
                .unwrap();
            for (i, c) in value.chars().enumerate() {
                chars[start + i] = c;
            }
        }
        chars.into_iter().collect()
    }

    #[test]
    fn test_parse_fields() {
        let raw = record(
            &[
                ("TYPE", "S"),
                ("DATUM", "261231"),
                ("KLANTNR", "1250"),
                ("BONNR", "1008018"),
                ("NAAM", "MICROLENS"),
                ("CODER", "7MG"),
                ("DRAD2R", "0.75"),
                ("CYLR", "-1.00"),
                ("IDL", "TL04"),
                ("DI", "08719326771229"),
            ],
            347,
        );
        let values = parse_regel(&raw);
        assert_eq!(values["TYPE"], "S");
        assert_eq!(values["DATUM"], "261231");
        assert_eq!(values["KLANTNR"], "1250");
        assert_eq!(values["BONNR"], "1008018");
        assert_eq!(values["NAAM"], "MICROLENS");
        assert_eq!(values["CODER"], "7MG");
        assert_eq!(values["DRAD2R"], "0.75");
        assert_eq!(values["CYLR"], "-1.00");
        assert_eq!(values["IDL"], "TL04");
        assert_eq!(values["DI"], "08719326771229");
        assert_eq!(values["UDI"], "");
        assert_eq!(values.len(), FIELDS.len());
    }

    #[test]
    fn test_udi_needs_long_record() {
        let udi = "(01)0871932677122";
        // Trailing marker keeps the padding from being trimmed away.
        let mut long = record(&[("TYPE", "S"), ("UDI", udi)], 370);
        long.push('X');
        assert_eq!(parse_regel(&long)["UDI"], udi);

        let mut exact = record(&[("TYPE", "S"), ("UDI", udi)], 366);
        exact.push('X');
        assert_eq!(parse_regel(&exact)["UDI"], "");
    }

    #[test]
    fn test_frame_and_nul_stripped() {
        let mut raw = record(&[("TYPE", "S"), ("NAAM", "AB\0C")], 100);
        raw.push_str("&\r\n");
        let values = parse_regel(&format!("=={}", raw));
        // Leading '=' frame characters are trimmed, so TYPE comes from the record.
        assert_eq!(values["TYPE"], "S");
        assert_eq!(values["NAAM"], "ABC");
    }

    #[test]
    fn test_short_record_gives_empty_fields() {
        let values = parse_regel("S261231");
        assert_eq!(values["DATUM"], "261231");
        assert_eq!(values["KLANTNR"], "");
        assert_eq!(values["DI"], "");
    }

    #[test]
    fn test_is_valid_regel() {
        assert!(is_valid_regel(&format!("S{}", "x".repeat(59))));
        assert!(is_valid_regel(&format!("#{}", "x".repeat(49))));
        assert!(!is_valid_regel(""));
        assert!(!is_valid_regel("   "));
        assert!(!is_valid_regel("S too short"));
        assert!(!is_valid_regel(&format!("X{}", "x".repeat(60))));
    }

    #[test]
    fn test_field_names_in_order() {
        let names: Vec<&str> = field_names().collect();
        assert_eq!(names.first(), Some(&"TYPE"));
        assert_eq!(names.last(), Some(&"UDI"));
        assert_eq!(names.len(), 56);
    }
}
