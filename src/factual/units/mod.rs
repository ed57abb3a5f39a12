// Unit normalization
// Converts a unit token to its SI base-unit expression


use std::f64::consts::PI;

const DIMENSIONLESS: &str = "dimensionless";

/// A value expressed in SI base units
#[derive(Debug, Clone, PartialEq)]
pub struct Canonical {
    pub si_unit: &'static str,
    pub value: f64,
}

/// Symbols accepted with or without a prefix: (symbol, factor to base, base unit)
const PREFIXABLE_SYMBOLS: &[(&str, f64, &str)] = &[
    ("m", 1.0, "meter"),
    ("g", 1e-3, "kilogram"),
    ("s", 1.0, "second"),
    ("Hz", 1.0, "1 / second"),
    ("B", 8.0, "bit"),
    ("bit", 1.0, "bit"),
    ("L", 1e-3, "meter ** 3"),
    ("l", 1e-3, "meter ** 3"),
    ("W", 1.0, "kilogram * meter ** 2 / second ** 3"),
    ("V", 1.0, "kilogram * meter ** 2 / ampere / second ** 3"),
    ("A", 1.0, "ampere"),
    ("J", 1.0, "kilogram * meter ** 2 / second ** 2"),
    ("N", 1.0, "kilogram * meter / second ** 2"),
    ("Pa", 1.0, "kilogram / meter / second ** 2"),
    ("mol", 1.0, "mole"),
    ("K", 1.0, "kelvin"),
    ("eV", 1.602_176_634e-19, "kilogram * meter ** 2 / second ** 2"),
];

/// Symbols never combined with a prefix
const PLAIN_SYMBOLS: &[(&str, f64, &str)] = &[
    ("%", 0.01, DIMENSIONLESS),
    ("min", 60.0, "second"),
    ("h", 3600.0, "second"),
    ("hr", 3600.0, "second"),
    ("d", 86_400.0, "second"),
    ("yr", 31_557_600.0, "second"),
    ("in", 0.0254, "meter"),
    ("ft", 0.3048, "meter"),
    ("mi", 1609.344, "meter"),
    ("lb", 0.453_592_37, "kilogram"),
    ("deg", PI / 180.0, "radian"),
    ("rad", 1.0, "radian"),
    ("cd", 1.0, "candela"),
    ("ppm", 1e-6, DIMENSIONLESS),
];

/// Full unit names, matched case-insensitively and in plural
const NAMES: &[(&str, f64, &str)] = &[
    ("meter", 1.0, "meter"),
    ("metre", 1.0, "meter"),
    ("gram", 1e-3, "kilogram"),
    ("second", 1.0, "second"),
    ("minute", 60.0, "second"),
    ("hour", 3600.0, "second"),
    ("day", 86_400.0, "second"),
    ("week", 604_800.0, "second"),
    ("year", 31_557_600.0, "second"),
    ("hertz", 1.0, "1 / second"),
    ("byte", 8.0, "bit"),
    ("bit", 1.0, "bit"),
    ("liter", 1e-3, "meter ** 3"),
    ("litre", 1e-3, "meter ** 3"),
    ("watt", 1.0, "kilogram * meter ** 2 / second ** 3"),
    ("volt", 1.0, "kilogram * meter ** 2 / ampere / second ** 3"),
    ("ampere", 1.0, "ampere"),
    ("joule", 1.0, "kilogram * meter ** 2 / second ** 2"),
    ("newton", 1.0, "kilogram * meter / second ** 2"),
    ("pascal", 1.0, "kilogram / meter / second ** 2"),
    ("mole", 1.0, "mole"),
    ("kelvin", 1.0, "kelvin"),
    ("percent", 0.01, DIMENSIONLESS),
    ("inch", 0.0254, "meter"),
    ("foot", 0.3048, "meter"),
    ("feet", 0.3048, "meter"),
    ("mile", 1609.344, "meter"),
    ("pound", 0.453_592_37, "kilogram"),
    ("degree", PI / 180.0, "radian"),
    ("radian", 1.0, "radian"),
];

const SYMBOL_PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("µ", 1e-6),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
];

const NAME_PREFIXES: &[(&str, f64)] = &[
    ("tera", 1e12),
    ("giga", 1e9),
    ("mega", 1e6),
    ("kilo", 1e3),
    ("centi", 1e-2),
    ("milli", 1e-3),
    ("micro", 1e-6),
    ("nano", 1e-9),
    ("pico", 1e-12),
];

fn lookup(table: &[(&str, f64, &'static str)], unit: &str) -> Option<(f64, &'static str)> {
    table
        .iter()
        .find(|(symbol, _, _)| *symbol == unit)
        .map(|&(_, factor, base)| (factor, base))
}

fn symbol_factor(unit: &str) -> Option<(f64, &'static str)> {
    if let Some(found) = lookup(PLAIN_SYMBOLS, unit).or_else(|| lookup(PREFIXABLE_SYMBOLS, unit)) {
        return Some(found);
    }

    SYMBOL_PREFIXES.iter().find_map(|&(prefix, scale)| {
        let base = unit.strip_prefix(prefix).filter(|rest| !rest.is_empty())?;
        lookup(PREFIXABLE_SYMBOLS, base).map(|(factor, si)| (scale * factor, si))
    })
}

fn name_factor(name: &str) -> Option<(f64, &'static str)> {
    let singular = |word: &str| -> Option<(f64, &'static str)> {
        lookup(NAMES, word).or_else(|| {
            word.strip_suffix('s')
                .filter(|stem| stem.len() > 2)
                .and_then(|stem| lookup(NAMES, stem))
        })
    };

    singular(name).or_else(|| {
        NAME_PREFIXES.iter().find_map(|&(prefix, scale)| {
            let base = name.strip_prefix(prefix).filter(|rest| !rest.is_empty())?;
            singular(base).map(|(factor, si)| (scale * factor, si))
        })
    })
}

/// Express `value unit` in SI base units, or `None` when the unit is unknown
#[inline]
pub fn to_base_units(value: f64, unit: &str) -> Option<Canonical> {
    let (factor, si_unit) = symbol_factor(unit).or_else(|| {
        if unit.chars().count() > 3 {
            name_factor(&unit.to_lowercase())
        } else {
            None
        }
    })?;

    Some(Canonical {
        si_unit,
        value: value * factor,
    })
}
