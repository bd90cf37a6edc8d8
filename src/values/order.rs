//! Structured orders mapped onto template values.
//!
//! Upstream systems that do not speak the fixed-width record format hand over
//! an [`OrderSpec`] instead. [`build_values_from_order`] flattens it into the
//! same field names a parsed record would produce, display fields included.

use serde::{Deserialize, Serialize};

use super::{ValueDefaults, ValueMap, fmt_num, side_subname, sign_power, udi_string};

/// One lens of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensSpec {
    pub product_code: String,
    pub code_full: Option<String>,
    pub diameter_mm: Option<f64>,
    pub overall_diameter_mm: Option<f64>,
    pub base_curve_mm: Option<f64>,
    pub sagittal_mm: Option<f64>,
    pub sphere_d: Option<f64>,
    pub cylinder_d: Option<f64>,
    pub axis_deg: Option<i32>,
    pub peripheral: Option<String>,
    pub type_desc: Option<String>,
    pub material: Option<String>,
    pub dk: Option<String>,
    pub execution: Option<String>,
    pub notes: Option<String>,
    /// `N`, `W` or `X`.
    pub scleral_aperture: Option<String>,
    /// `N`, `s`, `S`, `f` or `F`.
    pub scleral_edge: Option<String>,
    /// Toric ring, e.g. `0.75`.
    pub toric_ring: Option<String>,
}

/// A complete order: patient, lot, expiry and up to two lenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSpec {
    pub order_number: String,
    pub customer_code: String,
    pub patient_name: String,
    /// Expiry as `YYMMDD` (or `YYYYMMDD`).
    pub expiry_yymmdd: String,
    pub device_identifier: Option<String>,
    pub right: Option<LensSpec>,
    pub left: Option<LensSpec>,
    pub reference: Option<String>,
    pub code_short: Option<String>,
    pub id_right: Option<String>,
    pub id_left: Option<String>,
}

#[derive(Clone, Copy)]
enum Side {
    Right,
    Left,
}

impl Side {
    fn letter(self) -> &'static str {
        match self {
            Side::Right => "R",
            Side::Left => "L",
        }
    }
}

fn side_values(out: &mut ValueMap, side: Side, lens: &LensSpec) {
    let s = side.letter();
    let mut put = |key: String, value: String| {
        out.insert(key, value);
    };

    let base_sub = lens.type_desc.as_deref().unwrap_or("").trim().to_string();
    let aperture = lens
        .scleral_aperture
        .as_deref()
        .unwrap_or("")
        .to_ascii_uppercase();
    let sub = side_subname(
        &base_sub,
        &lens.product_code,
        &aperture,
        lens.scleral_edge.as_deref().unwrap_or(""),
        lens.toric_ring.as_deref().unwrap_or(""),
    );

    let cyl = sign_power(lens.cylinder_d);
    let cylinder_axis = match lens.axis_deg {
        Some(axis) if !cyl.is_empty() => format!("/{}x{}", cyl, axis),
        _ => String::new(),
    };

    put(format!("CODE{s}"), lens.product_code.clone());
    put("SUBNAAM".to_string(), base_sub);
    put(format!("SUBNAAM{s}"), sub);
    put(format!("CYLAS{s}"), cylinder_axis);
    for caption in ["SAG", "RAD", "DPT", "DIA", "PERIF"] {
        put(format!("{caption}{s}LBL"), caption.to_string());
    }
    put(format!("SAG{s}"), fmt_num(lens.sagittal_mm, 3));
    put(format!("RAD{s}"), fmt_num(lens.base_curve_mm, 2));
    put(format!("DPT{s}"), sign_power(lens.sphere_d));
    put(
        format!("DIA{s}"),
        fmt_num(lens.overall_diameter_mm.or(lens.diameter_mm), 2),
    );
    put(format!("PERIF{s}"), lens.peripheral.clone().unwrap_or_default());
    let marker = match side {
        Side::Right => ("RGT", "R"),
        Side::Left => ("LFT", "L"),
    };
    put(marker.0.to_string(), marker.1.to_string());
}

/// Flatten an order into template values.
///
/// Material and Dk come from the right lens, or the left one when the order
/// has no right lens.
pub fn build_values_from_order(order: &OrderSpec, defaults: &ValueDefaults) -> ValueMap {
    let device_identifier = order
        .device_identifier
        .clone()
        .unwrap_or_else(|| defaults.device_identifier.clone());
    let code_short = order
        .code_short
        .clone()
        .unwrap_or_else(|| defaults.code_short.clone());

    let mut out = ValueMap::new();
    for (key, value) in [
        ("NAAM", order.patient_name.clone()),
        ("BONNR", order.order_number.clone()),
        ("KLANTNR", order.customer_code.clone()),
        ("DATUM", order.expiry_yymmdd.clone()),
        (
            "UDI",
            udi_string(&device_identifier, &order.expiry_yymmdd, &order.order_number),
        ),
        ("DI", device_identifier),
        ("CODESH", code_short),
        ("REFER", order.reference.clone().unwrap_or_default()),
        ("MATLBL", defaults.mat_label.clone()),
        ("DKLBL", defaults.dk_label.clone()),
        ("POSXOFF", fmt_num(Some(defaults.pos_x_offset), 2)),
        ("CODER", String::new()),
        ("CODEL", String::new()),
        ("IDR", String::new()),
        ("IDL", String::new()),
    ] {
        out.insert(key.to_string(), value);
    }

    if let Some(lens) = &order.right {
        side_values(&mut out, Side::Right, lens);
        out.insert("IDR".into(), order.id_right.clone().unwrap_or_default());
    }
    if let Some(lens) = &order.left {
        side_values(&mut out, Side::Left, lens);
        out.insert("IDL".into(), order.id_left.clone().unwrap_or_default());
    }

    let primary = order.right.as_ref().or(order.left.as_ref());
    let material = primary.and_then(|lens| lens.material.clone());
    let dk = primary.and_then(|lens| lens.dk.clone());
    out.insert("MAT".into(), material.unwrap_or_default());
    out.insert("DK".into(), dk.unwrap_or_default());

    out.insert(
        "_show_right".into(),
        if order.right.is_some() { "1" } else { "0" }.into(),
    );
    out.insert(
        "_show_left".into(),
        if order.left.is_some() { "1" } else { "0" }.into(),
    );

    out
}

/// Sample two-lens order used by dry runs and the demo command.
pub fn demo_order(defaults: &ValueDefaults) -> OrderSpec {
    let common = LensSpec {
        product_code: "7MG".into(),
        code_full: Some("7MG&4V64C00840ACV".into()),
        diameter_mm: Some(13.0),
        overall_diameter_mm: Some(17.5),
        base_curve_mm: Some(7.80),
        sagittal_mm: Some(3.875),
        sphere_d: Some(2.0),
        cylinder_d: Some(-1.0),
        axis_deg: Some(10),
        peripheral: Some("Std".into()),
        type_desc: Some("mini MISA TFT".into()),
        material: Some("Optimum Extreme".into()),
        dk: Some("125".into()),
        execution: Some("TFT Wide".into()),
        notes: None,
        scleral_aperture: Some("W".into()),
        scleral_edge: Some("S".into()),
        toric_ring: Some("0.75".into()),
    };
    let left = LensSpec {
        scleral_edge: Some("f".into()),
        ..common.clone()
    };

    OrderSpec {
        order_number: "1008018".into(),
        customer_code: "1250".into(),
        patient_name: "MICROLENS".into(),
        expiry_yymmdd: "261231".into(),
        device_identifier: Some(defaults.device_identifier.clone()),
        right: Some(common),
        left: Some(left),
        reference: Some("TL03 / TL04".into()),
        code_short: Some(defaults.code_short.clone()),
        id_right: Some("TL03".into()),
        id_left: Some("TL04".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_order_values() {
        let defaults = ValueDefaults::default();
        let values = build_values_from_order(&demo_order(&defaults), &defaults);

        assert_eq!(values["NAAM"], "MICROLENS");
        assert_eq!(values["BONNR"], "1008018");
        assert_eq!(values["UDI"], "(01)08719326771229(17)261231(10)1008018");
        assert_eq!(values["SUBNAAMR"], "mini MISA TFT T1");
        assert_eq!(values["SUBNAAML"], "mini MISA TFT T1");
        assert_eq!(values["CYLASR"], "/-1x10");
        assert_eq!(values["SAGR"], "3.875");
        assert_eq!(values["RADL"], "7.8");
        assert_eq!(values["DPTR"], "+2");
        assert_eq!(values["DIAR"], "17.5");
        assert_eq!(values["SAGRLBL"], "SAG");
        assert_eq!(values["PERIFLLBL"], "PERIF");
        assert_eq!(values["IDR"], "TL03");
        assert_eq!(values["IDL"], "TL04");
        assert_eq!(values["MAT"], "Optimum Extreme");
        assert_eq!(values["DK"], "125");
        assert_eq!(values["RGT"], "R");
        assert_eq!(values["LFT"], "L");
        assert_eq!(values["POSXOFF"], "5");
        assert_eq!(values["_show_left"], "1");
    }

    #[test]
    fn test_scleral_order_subname() {
        let lens = LensSpec {
            product_code: "7MS".into(),
            type_desc: Some("ignored".into()),
            scleral_aperture: Some("w".into()),
            scleral_edge: Some("F".into()),
            ..Default::default()
        };
        let order = OrderSpec {
            right: Some(lens),
            ..Default::default()
        };
        let values = build_values_from_order(&order, &ValueDefaults::default());
        assert_eq!(values["SUBNAAMR"], "Wide f2");
        assert_eq!(values["CYLASR"], "");
        assert_eq!(values["_show_left"], "0");
        assert_eq!(values["IDL"], "");
    }

    #[test]
    fn test_left_only_order_takes_material_from_left() {
        let order = OrderSpec {
            left: Some(LensSpec {
                product_code: "5A".into(),
                material: Some("Boston XO".into()),
                ..Default::default()
            }),
            device_identifier: Some("123".into()),
            ..Default::default()
        };
        let values = build_values_from_order(&order, &ValueDefaults::default());
        assert_eq!(values["MAT"], "Boston XO");
        assert_eq!(values["CODER"], "");
        assert_eq!(values["CODEL"], "5A");
        assert_eq!(values["DI"], "123");
    }

    #[test]
    fn test_order_deserializes_with_defaults() {
        let order: OrderSpec =
            serde_json::from_str(r#"{"order_number": "42", "right": {"product_code": "7TA"}}"#)
                .unwrap();
        assert_eq!(order.order_number, "42");
        assert_eq!(order.right.unwrap().product_code, "7TA");
        assert!(order.left.is_none());
    }
}
