//! Furby command catalog
//!
//! The catalog is static: it is served verbatim by `GET /list` and consulted by
//! [`FurbySession`](crate::transport::FurbySession) to turn a command into a
//! packet. The dispatcher never validates names against it.

pub mod packet;

use serde::Serialize;

pub use packet::encode;

/// Description of a command a Furby understands
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamDescriptor],
}

/// Description of one command parameter
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: &'static str,
}

/// Wire type of a command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Integer in 0..=255
    Byte,
    Bool,
    /// One of a fixed set of names
    Enum,
    /// Hex-encoded bytes
    Hex,
}

const fn param(name: &'static str, kind: ParamKind, description: &'static str) -> ParamDescriptor {
    ParamDescriptor {
        name,
        kind,
        description,
    }
}

static CATALOG: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "antenna",
        description: "Set the antenna LED colour",
        params: &[
            param("red", ParamKind::Byte, "red channel"),
            param("green", ParamKind::Byte, "green channel"),
            param("blue", ParamKind::Byte, "blue channel"),
        ],
    },
    CommandDescriptor {
        name: "lcd",
        description: "Turn the eye displays on or off",
        params: &[param("state", ParamKind::Bool, "true to turn the displays on")],
    },
    CommandDescriptor {
        name: "debug",
        description: "Show the debug menu",
        params: &[],
    },
    CommandDescriptor {
        name: "cycleDebug",
        description: "Cycle through debug menu pages",
        params: &[],
    },
    CommandDescriptor {
        name: "action",
        description: "Trigger a built-in action sequence",
        params: &[
            param("input", ParamKind::Byte, "action input"),
            param("index", ParamKind::Byte, "action index"),
            param("subindex", ParamKind::Byte, "action subindex"),
            param("specific", ParamKind::Byte, "specific action"),
        ],
    },
    CommandDescriptor {
        name: "setName",
        description: "Change the Furby's name",
        params: &[param("name", ParamKind::Byte, "index into the built-in name table")],
    },
    CommandDescriptor {
        name: "moodMeter",
        description: "Set or increase one of the mood meters",
        params: &[
            param("action", ParamKind::Enum, "set | increase"),
            param(
                "type",
                ParamKind::Enum,
                "excitedness | displeasedness | tiredness | fullness | wellness",
            ),
            param("value", ParamKind::Byte, "meter value"),
        ],
    },
    CommandDescriptor {
        name: "raw",
        description: "Send an arbitrary packet",
        params: &[param("packet", ParamKind::Hex, "packet bytes, hex encoded")],
    },
];

/// The full command catalog
#[must_use]
pub fn catalog() -> &'static [CommandDescriptor] {
    CATALOG
}

/// Look up a command by name
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandDescriptor> {
    CATALOG.iter().find(|c| c.name == name)
}
