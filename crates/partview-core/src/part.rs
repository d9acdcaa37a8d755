//! Part identity, per-part metadata and material presets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::ValueError;
use crate::types::Color;

/// Deterministic palette for default part colors, indexed by `id % 8`.
pub const PALETTE: [Color; 8] = [
    Color::from_u32(0x4f46e5),
    Color::from_u32(0xe11d48),
    Color::from_u32(0x059669),
    Color::from_u32(0xf59e0b),
    Color::from_u32(0x0ea5e9),
    Color::from_u32(0x8b5cf6),
    Color::from_u32(0xf97316),
    Color::from_u32(0x64748b),
];

/// Identity of one mesh within one loaded scene.
///
/// Ids are dense (`0..N`) and only meaningful for the scene they were assigned
/// in. At the store boundary they travel as decimal strings, see
/// [`PartId::to_key`] and [`PartId::from_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PartId(pub u32);

impl PartId {
    /// Canonical string key used in `partsMeta` maps.
    pub fn to_key(self) -> String {
        self.0.to_string()
    }

    /// Parse a `partsMeta` key. Surrounding whitespace and leading zeros are
    /// accepted, so `"2"`, `" 2"` and `"02"` all name the same part.
    pub fn from_key(key: &str) -> Result<Self, ValueError> {
        key.trim()
            .parse::<u32>()
            .map(PartId)
            .map_err(|_| ValueError::InvalidPartKey {
                key: key.to_string(),
            })
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Default palette color for this id.
    pub fn palette_color(self) -> Color {
        PALETTE[self.index() % PALETTE.len()]
    }

    /// Default display name (`"Parte 1"` for id 0).
    pub fn default_name(self) -> String {
        format!("Parte {}", self.0 + 1)
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PartId {
    fn from(value: u32) -> Self {
        PartId(value)
    }
}

/// Surface finish applied to a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum MaterialPreset {
    #[default]
    Plastic,
    Metal,
    RoughMetal,
    Rubber,
    Glass,
}

/// Shading parameters of a preset in the Phong model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetParams {
    pub shininess: f32,
    pub specular: Color,
    pub opacity: f32,
    pub transparent: bool,
}

impl MaterialPreset {
    pub const ALL: [MaterialPreset; 5] = [
        MaterialPreset::Plastic,
        MaterialPreset::Metal,
        MaterialPreset::RoughMetal,
        MaterialPreset::Rubber,
        MaterialPreset::Glass,
    ];

    /// Wire name (`"roughMetal"` etc.).
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialPreset::Plastic => "plastic",
            MaterialPreset::Metal => "metal",
            MaterialPreset::RoughMetal => "roughMetal",
            MaterialPreset::Rubber => "rubber",
            MaterialPreset::Glass => "glass",
        }
    }

    pub fn params(&self) -> PresetParams {
        match self {
            MaterialPreset::Plastic => PresetParams {
                shininess: 30.0,
                specular: Color::from_u32(0x222222),
                opacity: 1.0,
                transparent: false,
            },
            MaterialPreset::Metal => PresetParams {
                shininess: 100.0,
                specular: Color::from_u32(0xcccccc),
                opacity: 1.0,
                transparent: false,
            },
            MaterialPreset::RoughMetal => PresetParams {
                shininess: 40.0,
                specular: Color::from_u32(0x777777),
                opacity: 1.0,
                transparent: false,
            },
            MaterialPreset::Rubber => PresetParams {
                shininess: 5.0,
                specular: Color::from_u32(0x050505),
                opacity: 1.0,
                transparent: false,
            },
            MaterialPreset::Glass => PresetParams {
                shininess: 120.0,
                specular: Color::WHITE,
                opacity: 0.35,
                transparent: true,
            },
        }
    }
}

impl fmt::Display for MaterialPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialPreset {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialPreset::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValueError::UnknownPreset {
                value: s.to_string(),
            })
    }
}

/// One entry of the part list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Part {
    pub id: PartId,
    pub name: String,
    pub visible: bool,
    pub color: Color,
    pub material_preset: MaterialPreset,
    pub notes: String,
}

impl Part {
    /// A part with default presentation. An empty `embedded_name` falls back
    /// to `"Parte {id+1}"`.
    pub fn with_defaults(id: PartId, embedded_name: &str) -> Self {
        let name = if embedded_name.trim().is_empty() {
            id.default_name()
        } else {
            embedded_name.to_string()
        };
        Self {
            id,
            name,
            visible: true,
            color: id.palette_color(),
            material_preset: MaterialPreset::default(),
            notes: String::new(),
        }
    }
}

/// Persisted metadata for one part.
///
/// Every field is optional: a missing field means "keep the part's current
/// value". Color and preset stay as raw strings so a malformed value from the
/// store degrades to the default instead of failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct PartMeta {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub notes: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub color: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub material_preset: Option<String>,
}

impl PartMeta {
    /// Snapshot every field of a part.
    pub fn from_part(part: &Part) -> Self {
        Self {
            name: Some(part.name.clone()),
            notes: Some(part.notes.clone()),
            color: Some(part.color.to_hex()),
            material_preset: Some(part.material_preset.as_str().to_string()),
        }
    }

    /// Parsed color, if present and well-formed.
    pub fn parsed_color(&self) -> Option<Color> {
        self.color.as_deref().and_then(Color::from_hex)
    }

    /// Parsed preset, if present and known.
    pub fn parsed_preset(&self) -> Option<MaterialPreset> {
        self.material_preset.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Persisted metadata keyed by canonical part id.
pub type PartsMeta = BTreeMap<PartId, PartMeta>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_key_normalization() {
        assert_eq!(PartId::from_key("2"), Ok(PartId(2)));
        assert_eq!(PartId::from_key(" 2 "), Ok(PartId(2)));
        assert_eq!(PartId::from_key("02"), Ok(PartId(2)));
        assert!(PartId::from_key("-1").is_err());
        assert!(PartId::from_key("two").is_err());
        assert_eq!(PartId(7).to_key(), "7");
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(PartId(0).palette_color(), PartId(8).palette_color());
        assert_ne!(PartId(0).palette_color(), PartId(1).palette_color());
    }

    #[test]
    fn test_default_part() {
        let part = Part::with_defaults(PartId(0), "");
        assert_eq!(part.name, "Parte 1");
        assert!(part.visible);
        assert_eq!(part.material_preset, MaterialPreset::Plastic);
        assert_eq!(part.color, PALETTE[0]);
        assert!(part.notes.is_empty());

        let named = Part::with_defaults(PartId(3), "Hinge");
        assert_eq!(named.name, "Hinge");
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("roughMetal".parse(), Ok(MaterialPreset::RoughMetal));
        assert_eq!("GLASS".parse(), Ok(MaterialPreset::Glass));
        assert!("wood".parse::<MaterialPreset>().is_err());
        for preset in MaterialPreset::ALL {
            assert_eq!(preset.as_str().parse(), Ok(preset));
        }
    }

    #[test]
    fn test_only_glass_is_transparent() {
        for preset in MaterialPreset::ALL {
            let params = preset.params();
            assert_eq!(params.transparent, preset == MaterialPreset::Glass);
            assert_eq!(params.opacity < 1.0, params.transparent);
        }
    }

    #[test]
    fn test_meta_tolerates_bad_values() {
        let meta = PartMeta {
            color: Some("not-a-color".into()),
            material_preset: Some("wood".into()),
            ..Default::default()
        };
        assert_eq!(meta.parsed_color(), None);
        assert_eq!(meta.parsed_preset(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_part_meta_wire_names() {
        let part = Part::with_defaults(PartId(1), "Lid");
        let json = serde_json::to_value(PartMeta::from_part(&part)).unwrap();
        assert_eq!(json["materialPreset"], "plastic");
        assert_eq!(json["name"], "Lid");

        let meta: PartMeta = serde_json::from_str(r##"{"color": "#ff0000"}"##).unwrap();
        assert_eq!(meta.parsed_color(), Some(Color::rgb(255, 0, 0)));
        assert!(meta.name.is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn key_roundtrips(id in any::<u32>()) {
                prop_assert_eq!(PartId::from_key(&PartId(id).to_key()), Ok(PartId(id)));
            }

            #[test]
            fn padded_keys_normalize(id in 0u32..100_000, pad in 0usize..4) {
                let key = format!(" {}{} ", "0".repeat(pad), id);
                prop_assert_eq!(PartId::from_key(&key), Ok(PartId(id)));
            }
        }
    }
}
