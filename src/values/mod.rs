//! # Value Post-Processing
//!
//! Raw record fields are flat strings. Before rendering, a handful of display
//! fields are derived from them: product sub-names with scleral/toric codes,
//! cylinder/axis strings, side visibility flags and the GS1 UDI string.
//!
//! ## Derived Fields
//!
//! | Field | Source |
//! |-------|--------|
//! | `SUBNAAMR` / `SUBNAAML` | `SUBNAAM`, `CODER/L`, `SCLAPTR/L`, `SCLEDGR/L`, `DRAD2R/L` |
//! | `CYLASR` / `CYLASL` | `CYLR/L`, `XASR/L` |
//! | `_show_right` / `_show_left` | `CODER/L` |
//! | `UDI` | `DI`, `DATUM`, `BONNR` |

pub mod order;

pub use order::{LensSpec, OrderSpec, build_values_from_order, demo_order};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flat field name → value map fed to the template renderer.
pub type ValueMap = HashMap<String, String>;

/// Domain defaults used when upstream records omit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueDefaults {
    /// Caption printed before the material name.
    pub mat_label: String,
    /// Caption printed before the oxygen permeability (Dk) value.
    pub dk_label: String,
    /// GS1 device identifier used for UDI generation.
    pub device_identifier: String,
    /// Short company code printed on the box label.
    pub code_short: String,
    /// Horizontal offset between the right and left lens blocks.
    pub pos_x_offset: f64,
}

impl Default for ValueDefaults {
    fn default() -> Self {
        Self {
            mat_label: "MAT".to_string(),
            dk_label: "DK".to_string(),
            device_identifier: "08719326771229".to_string(),
            code_short: "CODESH".to_string(),
            pos_x_offset: 5.0,
        }
    }
}

/// Scleral aperture code → sub-name prefix.
fn aperture_label(code: &str) -> &'static str {
    match code {
        "W" => "Wide ",
        "X" => "Extra Wide ",
        _ => "",
    }
}

/// Scleral edge code → sub-name marker.
fn edge_label(code: &str) -> &'static str {
    match code {
        "s" => "s1",
        "S" => "s2",
        "f" => "f1",
        "F" => "f2",
        _ => "",
    }
}

/// Toric ring suffix for a two-character product code prefix.
///
/// `7M` codes know rings 0.75/1.50, `7T` codes 0.50/1.00/1.50. Anything else
/// has no suffix.
pub fn edge_suffix_for(code_prefix: &str, drad2: &str) -> &'static str {
    let drad2 = drad2.trim();
    if code_prefix.starts_with("7M") {
        match drad2 {
            "0.75" => " T1",
            "1.50" => " T2",
            _ => "",
        }
    } else if code_prefix.starts_with("7T") {
        match drad2 {
            "0.50" => " T1",
            "1.00" => " T2",
            "1.50" => " T3",
            _ => "",
        }
    } else {
        ""
    }
}

/// Product sub-name for one side.
///
/// `7MS` codes replace the name with aperture + edge markers; `7M`/`7T`
/// codes then get their toric ring suffix.
pub(crate) fn side_subname(
    base: &str,
    code: &str,
    aperture: &str,
    edge: &str,
    drad2: &str,
) -> String {
    let mut sub = if code.starts_with("7MS") {
        format!("{}{}", aperture_label(aperture), edge_label(edge))
    } else {
        base.to_string()
    };
    sub.truncate(sub.trim_end().len());
    sub.push_str(edge_suffix_for(prefix(code, 2), drad2));
    sub
}

fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// True when the text is blank or parses as numeric zero.
pub fn is_blank_or_zero(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() {
        return true;
    }
    t.parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
}

/// Fixed-point number with trailing zeros (and a bare point) removed.
pub fn fmt_num(x: Option<f64>, places: usize) -> String {
    match x {
        Some(v) => strip_fraction_zeros(format!("{:.*}", places, v)),
        None => String::new(),
    }
}

/// Signed dioptre power, e.g. `+2`, `-1.25`.
pub fn sign_power(x: Option<f64>) -> String {
    match x {
        Some(v) => strip_fraction_zeros(format!("{:+.2}", v)),
        None => String::new(),
    }
}

fn strip_fraction_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Reduce a GS1 expiry date to `YYMMDD`.
///
/// Keeps digits only; an 8-digit `YYYYMMDD` date loses its century.
pub fn normalize_gs1_date(expiry: &str) -> String {
    let digits: String = expiry.chars().filter(char::is_ascii_digit).collect();
    let digits = if digits.len() >= 8 {
        &digits[digits.len() - 8..]
    } else {
        digits.as_str()
    };
    if digits.len() == 8 {
        digits[2..].to_string()
    } else {
        digits.to_string()
    }
}

/// GS1 human-readable UDI: `(01)<DI>(17)<YYMMDD>(10)<LOT>`.
pub fn udi_string(device_identifier: &str, expiry: &str, lot: &str) -> String {
    format!(
        "(01){}(17){}(10){}",
        device_identifier.trim(),
        normalize_gs1_date(expiry),
        lot.trim()
    )
}

fn cylinder_axis(cyl: &str, axis: &str) -> String {
    let cyl = cyl.trim();
    if cyl.is_empty() {
        String::new()
    } else {
        format!("/{}x{}", cyl, axis.trim())
    }
}

/// Add derived display fields to a raw value map.
///
/// Every input field is kept. Blank caption and company fields are filled
/// from `defaults` before the UDI is derived.
pub fn derive_display_fields(values: &ValueMap, defaults: &ValueDefaults) -> ValueMap {
    let get = |key: &str| values.get(key).map(String::as_str).unwrap_or("");
    let mut out = values.clone();

    let subname = get("SUBNAAM").trim_end();
    for side in ['R', 'L'] {
        let key = |base: &str| format!("{}{}", base, side);
        let code = get(&key("CODE"));

        out.insert(
            key("SUBNAAM"),
            side_subname(
                subname,
                code,
                get(&key("SCLAPT")),
                get(&key("SCLEDG")),
                get(&key("DRAD2")),
            ),
        );
        out.insert(key("CYLAS"), cylinder_axis(get(&key("CYL")), get(&key("XAS"))));

        let flag = if side == 'R' { "_show_right" } else { "_show_left" };
        let shown = if is_blank_or_zero(code) { "0" } else { "1" };
        out.insert(flag.to_string(), shown.to_string());
    }

    for (key, default) in [
        ("MATLBL", &defaults.mat_label),
        ("DKLBL", &defaults.dk_label),
        ("DI", &defaults.device_identifier),
        ("CODESH", &defaults.code_short),
    ] {
        if get(key).trim().is_empty() {
            out.insert(key.to_string(), default.clone());
        }
    }

    let udi = get("UDI");
    let udi = if !udi.trim().is_empty() {
        udi.to_string()
    } else if ["DI", "DATUM", "BONNR"].iter().any(|k| !get(k).trim().is_empty()) {
        let di = out.get("DI").map(String::as_str).unwrap_or("");
        udi_string(di, get("DATUM"), get("BONNR"))
    } else {
        String::new()
    };
    out.insert("UDI".to_string(), udi);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, &str)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn derive(pairs: &[(&str, &str)]) -> ValueMap {
        derive_display_fields(&values(pairs), &ValueDefaults::default())
    }

    #[test]
    fn test_edge_suffix_for() {
        assert_eq!(edge_suffix_for("7M", "0.75"), " T1");
        assert_eq!(edge_suffix_for("7M", "1.50"), " T2");
        assert_eq!(edge_suffix_for("7M", "0.50"), "");
        assert_eq!(edge_suffix_for("7T", "0.50"), " T1");
        assert_eq!(edge_suffix_for("7T", "1.00"), " T2");
        assert_eq!(edge_suffix_for("7T", "1.50"), " T3");
        assert_eq!(edge_suffix_for("5A", "1.50"), "");
    }

    #[test]
    fn test_is_blank_or_zero() {
        assert!(is_blank_or_zero(""));
        assert!(is_blank_or_zero("   "));
        assert!(is_blank_or_zero("0"));
        assert!(is_blank_or_zero("0.00"));
        assert!(!is_blank_or_zero("7MG"));
        assert!(!is_blank_or_zero("12"));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(fmt_num(Some(3.875), 3), "3.875");
        assert_eq!(fmt_num(Some(7.80), 2), "7.8");
        assert_eq!(fmt_num(Some(17.0), 2), "17");
        assert_eq!(fmt_num(Some(10.0), 0), "10");
        assert_eq!(fmt_num(None, 2), "");
        assert_eq!(sign_power(Some(2.0)), "+2");
        assert_eq!(sign_power(Some(-1.25)), "-1.25");
        assert_eq!(sign_power(Some(10.0)), "+10");
        assert_eq!(sign_power(None), "");
    }

    #[test]
    fn test_normalize_gs1_date() {
        assert_eq!(normalize_gs1_date("261231"), "261231");
        assert_eq!(normalize_gs1_date("20261231"), "261231");
        assert_eq!(normalize_gs1_date("2026-12-31"), "261231");
        assert_eq!(normalize_gs1_date(""), "");
    }

    #[test]
    fn test_udi_string() {
        assert_eq!(
            udi_string(" 08719326771229 ", "20261231", "1008018 "),
            "(01)08719326771229(17)261231(10)1008018"
        );
    }

    #[test]
    fn test_derive_keeps_input_and_adds_fields() {
        let out = derive(&[("NAAM", "MICROLENS"), ("SUBNAAM", "mini MISA   ")]);
        assert_eq!(out["NAAM"], "MICROLENS");
        assert_eq!(out["SUBNAAMR"], "mini MISA");
        assert_eq!(out["SUBNAAML"], "mini MISA");
        assert_eq!(out["_show_right"], "0");
        assert_eq!(out["_show_left"], "0");
        assert_eq!(out["MATLBL"], "MAT");
        assert_eq!(out["DKLBL"], "DK");
        assert_eq!(out["CODESH"], "CODESH");
    }

    #[test]
    fn test_derive_scleral_subname() {
        let out = derive(&[
            ("SUBNAAM", "MISA"),
            ("CODER", "7MS123"),
            ("SCLAPTR", "W"),
            ("SCLEDGR", "S"),
            ("CODEL", "7MS123"),
            ("SCLAPTL", "X"),
            ("SCLEDGL", "N"),
            ("DRAD2L", "1.50"),
        ]);
        assert_eq!(out["SUBNAAMR"], "Wide s2");
        assert_eq!(out["SUBNAAML"], "Extra Wide T2");
        assert_eq!(out["_show_right"], "1");
    }

    #[test]
    fn test_derive_toric_suffix() {
        let out = derive(&[
            ("SUBNAAM", "Toric"),
            ("CODER", "7TA"),
            ("DRAD2R", "1.00"),
            ("CODEL", "7MG"),
            ("DRAD2L", "0.75"),
        ]);
        assert_eq!(out["SUBNAAMR"], "Toric T2");
        assert_eq!(out["SUBNAAML"], "Toric T1");
    }

    #[test]
    fn test_derive_cylinder_axis() {
        let out = derive(&[("CYLR", "-1.00"), ("XASR", "10"), ("CYLL", "  ")]);
        assert_eq!(out["CYLASR"], "/-1.00x10");
        assert_eq!(out["CYLASL"], "");
    }

    #[test]
    fn test_derive_udi() {
        let out = derive(&[("DATUM", "261231"), ("BONNR", "1008018")]);
        assert_eq!(out["DI"], "08719326771229");
        assert_eq!(out["UDI"], "(01)08719326771229(17)261231(10)1008018");

        let kept = derive(&[("UDI", "(01)X"), ("BONNR", "1")]);
        assert_eq!(kept["UDI"], "(01)X");

        let empty = derive(&[]);
        assert_eq!(empty["UDI"], "");
    }

    #[test]
    fn test_prefix_is_char_safe() {
        assert_eq!(prefix("7MS", 2), "7M");
        assert_eq!(prefix("é7", 1), "é");
        assert_eq!(prefix("7", 3), "7");
    }
}
