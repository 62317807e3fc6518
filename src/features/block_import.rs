//! Canned block libraries for the block browsers.
//!
//! Outside SketchUp there is nobody to answer `load*Blocks`, so the browsers
//! fall back to these lists and to a simulated import result.

use serde::Serialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Serialize)]
pub struct MockBlock {
    pub name: &'static str,
    pub category: &'static str,
    pub path: &'static str,
}

#[derive(Debug)]
pub struct BlockMock {
    pub blocks: &'static [MockBlock],
}

pub static ELECTRICAL_BLOCKS: BlockMock = BlockMock {
    blocks: &[
        MockBlock { name: "Tomada baixa 2P+T 10A", category: "Tomadas", path: "eletrica/tomadas/tomada_baixa_10a.skp" },
        MockBlock { name: "Tomada média 2P+T 20A", category: "Tomadas", path: "eletrica/tomadas/tomada_media_20a.skp" },
        MockBlock { name: "Interruptor simples", category: "Interruptores", path: "eletrica/interruptores/simples.skp" },
        MockBlock { name: "Interruptor paralelo", category: "Interruptores", path: "eletrica/interruptores/paralelo.skp" },
        MockBlock { name: "Quadro de distribuição", category: "Quadros", path: "eletrica/quadros/qd_embutir.skp" },
    ],
};

pub static LIGHTING_BLOCKS: BlockMock = BlockMock {
    blocks: &[
        MockBlock { name: "Spot embutido", category: "Embutidos", path: "iluminacao/embutidos/spot_mr16.skp" },
        MockBlock { name: "Plafon sobrepor", category: "Sobrepor", path: "iluminacao/sobrepor/plafon_30.skp" },
        MockBlock { name: "Perfil de LED linear", category: "Perfis", path: "iluminacao/perfis/perfil_linear.skp" },
        MockBlock { name: "Pendente", category: "Pendentes", path: "iluminacao/pendentes/pendente_cupula.skp" },
    ],
};

pub static BASEBOARD_BLOCKS: BlockMock = BlockMock {
    blocks: &[
        MockBlock { name: "Rodapé poliestireno 7cm", category: "Poliestireno", path: "rodapes/poliestireno_7cm.skp" },
        MockBlock { name: "Rodapé poliestireno 10cm", category: "Poliestireno", path: "rodapes/poliestireno_10cm.skp" },
        MockBlock { name: "Rodapé madeira 15cm", category: "Madeira", path: "rodapes/madeira_15cm.skp" },
    ],
};

/// Payload a host would send to `handle*BlocksList`.
pub fn list_payload(mock: &BlockMock) -> Value {
    json!({
        "success": true,
        "blocks": mock.blocks,
    })
}

/// Simulated answer to `import*Block`.
pub fn import_payload(args: &Map<String, Value>) -> Value {
    let block = args
        .get("blockName")
        .or_else(|| args.get("blockPath"))
        .and_then(Value::as_str)
        .unwrap_or("bloco");
    json!({
        "success": true,
        "message": format!("Bloco \"{block}\" importado (simulação)"),
    })
}
