//! Static description of every feature the dashboard drives in SketchUp.
//!
//! Method and callback names are the host plugin's wire contract and must
//! not be renamed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::FeatureError;
use super::block_import::{BASEBOARD_BLOCKS, BlockMock, ELECTRICAL_BLOCKS, LIGHTING_BLOCKS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    RoomAnnotation,
    CeilingAnnotation,
    LightingAnnotation,
    ComponentUpdater,
    HeightAnnotation,
    SectionAnnotation,
    ViewIndication,
    CircuitConnection,
    ElectricalBlocks,
    LightingBlocks,
    BaseboardBlocks,
    RoomReport,
    ElectricalReport,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 13] = [
        Self::RoomAnnotation,
        Self::CeilingAnnotation,
        Self::LightingAnnotation,
        Self::ComponentUpdater,
        Self::HeightAnnotation,
        Self::SectionAnnotation,
        Self::ViewIndication,
        Self::CircuitConnection,
        Self::ElectricalBlocks,
        Self::LightingBlocks,
        Self::BaseboardBlocks,
        Self::RoomReport,
        Self::ElectricalReport,
    ];

    pub fn descriptor(self) -> &'static FeatureDescriptor {
        // CATALOG is declared in the same order as the enum
        &CATALOG[self as usize]
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::RoomAnnotation => "room-annotation",
            Self::CeilingAnnotation => "ceiling-annotation",
            Self::LightingAnnotation => "lighting-annotation",
            Self::ComponentUpdater => "component-updater",
            Self::HeightAnnotation => "height-annotation",
            Self::SectionAnnotation => "section-annotation",
            Self::ViewIndication => "view-indication",
            Self::CircuitConnection => "circuit-connection",
            Self::ElectricalBlocks => "electrical-blocks",
            Self::LightingBlocks => "lighting-blocks",
            Self::BaseboardBlocks => "baseboard-blocks",
            Self::RoomReport => "room-report",
            Self::ElectricalReport => "electrical-report",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for FeatureKind {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| FeatureError::UnknownFeature(s.to_string()))
    }
}

/// How an incoming defaults payload combines with the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// The payload becomes the snapshot; absent fields are lost.
    Replace,
    /// Shallow merge; fields absent from the payload keep their value.
    Merge,
}

/// Initial value of a defaults field, before the host has answered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::from(i),
            Self::Float(f) => Value::from(f),
            Self::Str(s) => Value::String(s.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureAction {
    /// Name used by the HTTP API (`/actions/{key}`)
    pub key: &'static str,
    pub method: &'static str,
    pub result_callback: &'static str,
    /// Fields that fall back to the defaults snapshot when the caller omits them
    pub fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct FeatureDescriptor {
    pub kind: FeatureKind,
    pub title: &'static str,
    pub load_method: &'static str,
    pub defaults_callback: &'static str,
    pub policy: MergePolicy,
    pub actions: &'static [FeatureAction],
    pub initial_defaults: &'static [(&'static str, DefaultValue)],
    #[serde(skip)]
    pub mock: Option<&'static BlockMock>,
}

impl FeatureDescriptor {
    pub fn action(&self, key: &str) -> Option<&'static FeatureAction> {
        self.actions.iter().find(|a| a.key == key)
    }

    /// Every callback name this feature listens on.
    pub fn callbacks(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.defaults_callback).chain(self.actions.iter().map(|a| a.result_callback))
    }
}

use DefaultValue::{Bool, Float, Int, Str};

pub static CATALOG: [FeatureDescriptor; 13] = [
    FeatureDescriptor {
        kind: FeatureKind::RoomAnnotation,
        title: "Anotação de ambientes",
        load_method: "loadRoomAnnotationDefaults",
        defaults_callback: "handleRoomAnnotationDefaults",
        policy: MergePolicy::Merge,
        actions: &[FeatureAction {
            key: "start",
            method: "startRoomAnnotation",
            result_callback: "handleRoomAnnotationResult",
            fields: &["floorHeight", "showCeilingHeight", "ceilingHeight", "showLevel", "level", "scale", "font"],
        }],
        initial_defaults: &[
            ("floorHeight", Float(0.0)),
            ("showCeilingHeight", Bool(true)),
            ("ceilingHeight", Float(2.7)),
            ("showLevel", Bool(false)),
            ("level", Str("0,00")),
            ("scale", Int(25)),
            ("font", Str("Century Gothic")),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::CeilingAnnotation,
        title: "Anotação de forro",
        load_method: "loadCeilingAnnotationDefaults",
        defaults_callback: "handleCeilingAnnotationDefaults",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "start",
            method: "startCeilingAnnotation",
            result_callback: "handleCeilingAnnotationResult",
            fields: &["ceilingHeight", "finish", "showFinish", "scale"],
        }],
        initial_defaults: &[
            ("ceilingHeight", Float(2.7)),
            ("finish", Str("Gesso liso")),
            ("showFinish", Bool(true)),
            ("scale", Int(25)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::LightingAnnotation,
        title: "Anotação de iluminação",
        load_method: "loadLightingAnnotationDefaults",
        defaults_callback: "handleLightingAnnotationDefaults",
        policy: MergePolicy::Merge,
        actions: &[FeatureAction {
            key: "start",
            method: "startLightingAnnotation",
            result_callback: "handleLightingAnnotationResult",
            fields: &["layer", "circuit", "power", "symbolSize"],
        }],
        initial_defaults: &[
            ("layer", Str("ILUMINACAO")),
            ("circuit", Str("1")),
            ("power", Int(60)),
            ("symbolSize", Float(0.25)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::ComponentUpdater,
        title: "Atualizar atributos elétricos",
        load_method: "loadComponentUpdaterDefaults",
        defaults_callback: "handleComponentUpdaterDefaults",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "start",
            method: "startComponentUpdate",
            result_callback: "handleComponentUpdateResult",
            fields: &["attribute", "value", "onlySelection"],
        }],
        initial_defaults: &[
            ("attribute", Str("circuito")),
            ("value", Str("")),
            ("onlySelection", Bool(true)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::HeightAnnotation,
        title: "Cotas de altura e impressão",
        load_method: "loadHeightAnnotationDefaults",
        defaults_callback: "handleHeightAnnotationDefaults",
        policy: MergePolicy::Merge,
        actions: &[
            FeatureAction {
                key: "start",
                method: "startHeightAnnotation",
                result_callback: "handleHeightAnnotationResult",
                fields: &["heightScale", "decimals", "showUnit"],
            },
            FeatureAction {
                key: "print",
                method: "startPrintAnnotation",
                result_callback: "handlePrintAnnotationResult",
                fields: &["printScale", "printTitle"],
            },
        ],
        initial_defaults: &[
            ("heightScale", Int(25)),
            ("decimals", Int(2)),
            ("showUnit", Bool(true)),
            ("printScale", Int(50)),
            ("printTitle", Str("PLANTA BAIXA")),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::SectionAnnotation,
        title: "Indicação de cortes",
        load_method: "loadSectionAnnotationDefaults",
        defaults_callback: "handleSectionAnnotationDefaults",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "start",
            method: "startSectionAnnotation",
            result_callback: "handleSectionAnnotationResult",
            fields: &["prefix", "letter", "scale", "showArrows"],
        }],
        initial_defaults: &[
            ("prefix", Str("CORTE")),
            ("letter", Str("A")),
            ("scale", Int(50)),
            ("showArrows", Bool(true)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::ViewIndication,
        title: "Indicação de vistas",
        load_method: "loadViewIndicationDefaults",
        defaults_callback: "handleViewIndicationDefaults",
        policy: MergePolicy::Merge,
        actions: &[FeatureAction {
            key: "start",
            method: "startViewIndication",
            result_callback: "handleViewIndicationResult",
            fields: &["prefix", "number", "scale", "arrowSize"],
        }],
        initial_defaults: &[
            ("prefix", Str("VISTA")),
            ("number", Int(1)),
            ("scale", Int(25)),
            ("arrowSize", Float(0.3)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::CircuitConnection,
        title: "Conexão de circuitos",
        load_method: "loadCircuitConnectionDefaults",
        defaults_callback: "handleCircuitConnectionDefaults",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "start",
            method: "startCircuitConnection",
            result_callback: "handleCircuitConnectionResult",
            fields: &["circuit", "cableType", "curveRadius"],
        }],
        initial_defaults: &[
            ("circuit", Str("1")),
            ("cableType", Str("flexível")),
            ("curveRadius", Float(0.15)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::ElectricalBlocks,
        title: "Blocos elétricos",
        load_method: "loadElectricalBlocks",
        defaults_callback: "handleElectricalBlocksList",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "import",
            method: "importElectricalBlock",
            result_callback: "handleElectricalBlockImportResult",
            fields: &["blockPath"],
        }],
        initial_defaults: &[],
        mock: Some(&ELECTRICAL_BLOCKS),
    },
    FeatureDescriptor {
        kind: FeatureKind::LightingBlocks,
        title: "Blocos de iluminação",
        load_method: "loadLightingBlocks",
        defaults_callback: "handleLightingBlocksList",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "import",
            method: "importLightingBlock",
            result_callback: "handleLightingBlockImportResult",
            fields: &["blockPath"],
        }],
        initial_defaults: &[],
        mock: Some(&LIGHTING_BLOCKS),
    },
    FeatureDescriptor {
        kind: FeatureKind::BaseboardBlocks,
        title: "Blocos de rodapé",
        load_method: "loadBaseboardBlocks",
        defaults_callback: "handleBaseboardBlocksList",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "import",
            method: "importBaseboardBlock",
            result_callback: "handleBaseboardBlockImportResult",
            fields: &["blockPath"],
        }],
        initial_defaults: &[],
        mock: Some(&BASEBOARD_BLOCKS),
    },
    FeatureDescriptor {
        kind: FeatureKind::RoomReport,
        title: "Relatório de ambientes",
        load_method: "loadRoomReportDefaults",
        defaults_callback: "handleRoomReportDefaults",
        policy: MergePolicy::Merge,
        actions: &[FeatureAction {
            key: "export",
            method: "exportRoomReport",
            result_callback: "handleRoomReportExportResult",
            fields: &["format", "includeAreas", "includePerimeter", "decimals"],
        }],
        initial_defaults: &[
            ("format", Str("xlsx")),
            ("includeAreas", Bool(true)),
            ("includePerimeter", Bool(true)),
            ("decimals", Int(2)),
        ],
        mock: None,
    },
    FeatureDescriptor {
        kind: FeatureKind::ElectricalReport,
        title: "Relatório elétrico",
        load_method: "loadElectricalReportDefaults",
        defaults_callback: "handleElectricalReportDefaults",
        policy: MergePolicy::Replace,
        actions: &[FeatureAction {
            key: "export",
            method: "exportElectricalReport",
            result_callback: "handleElectricalReportExportResult",
            fields: &["format", "groupByCircuit", "includeUnassigned"],
        }],
        initial_defaults: &[
            ("format", Str("xlsx")),
            ("groupByCircuit", Bool(true)),
            ("includeUnassigned", Bool(false)),
        ],
        mock: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_order_matches_enum() {
        for kind in FeatureKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
        }
    }

    #[test]
    fn slug_round_trips_through_from_str() {
        for kind in FeatureKind::ALL {
            assert_eq!(kind.slug().parse::<FeatureKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.slug());
        }
        assert!(matches!(
            "floor-plan".parse::<FeatureKind>(),
            Err(FeatureError::UnknownFeature(_))
        ));
    }

    #[test]
    fn callback_names_are_disjoint_across_features() {
        let mut seen = HashSet::new();
        for kind in FeatureKind::ALL {
            for name in kind.descriptor().callbacks() {
                assert!(seen.insert(name), "{name} used twice");
            }
        }
    }

    #[test]
    fn only_block_browsers_have_mocks() {
        let mocked: Vec<_> = FeatureKind::ALL
            .into_iter()
            .filter(|k| k.descriptor().mock.is_some())
            .collect();
        assert_eq!(
            mocked,
            vec![
                FeatureKind::ElectricalBlocks,
                FeatureKind::LightingBlocks,
                FeatureKind::BaseboardBlocks
            ]
        );
    }

    #[test]
    fn height_annotation_has_print_action() {
        let d = FeatureKind::HeightAnnotation.descriptor();
        assert_eq!(d.action("print").unwrap().method, "startPrintAnnotation");
        assert!(d.action("nope").is_none());
    }
}
