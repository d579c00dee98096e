//! The command tree as the client sees it.

use crate::commands::argument::StringKind;
use crate::commands::cause::CommandCause;
use crate::commands::dispatcher::CommandDispatcher;
use crate::commands::tree::{CommandTree, NodeId, NodeKind};
use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use sponge_network::packets::clientbound::CDeclareCommandsNodeParser;

pub const ASK_SERVER: &str = "minecraft:ask_server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Root,
    Literal,
    Argument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

pub type Properties = IndexMap<String, PropertyValue>;

/// Argument parsers the client knows how to run locally.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCompletionType {
    Bool,
    Integer { min: Option<i32>, max: Option<i32> },
    Long { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f32>, max: Option<f32> },
    Double { min: Option<f64>, max: Option<f64> },
    String(StringKind),
    Entity { single: bool, players_only: bool },
    GameProfile,
}

fn put_bounds<T>(properties: &mut Properties, min: Option<T>, max: Option<T>, wrap: fn(T) -> PropertyValue) {
    if let Some(min) = min {
        properties.insert("min".to_string(), wrap(min));
    }
    if let Some(max) = max {
        properties.insert("max".to_string(), wrap(max));
    }
}

impl ClientCompletionType {
    pub fn identifier(&self) -> &'static str {
        self.to_wire().identifier()
    }

    pub fn properties(&self) -> Properties {
        let mut properties = Properties::new();
        match self {
            ClientCompletionType::Bool | ClientCompletionType::GameProfile => {}
            ClientCompletionType::Integer { min, max } => {
                put_bounds(&mut properties, *min, *max, |v| PropertyValue::Integer(v as i64))
            }
            ClientCompletionType::Long { min, max } => {
                put_bounds(&mut properties, *min, *max, PropertyValue::Integer)
            }
            ClientCompletionType::Float { min, max } => {
                put_bounds(&mut properties, *min, *max, |v| PropertyValue::Double(v as f64))
            }
            ClientCompletionType::Double { min, max } => {
                put_bounds(&mut properties, *min, *max, PropertyValue::Double)
            }
            ClientCompletionType::String(kind) => {
                properties.insert("type".to_string(), PropertyValue::String(kind.name().to_string()));
            }
            ClientCompletionType::Entity {
                single,
                players_only,
            } => {
                let amount = if *single { "single" } else { "multiple" };
                let kind = if *players_only { "players" } else { "entities" };
                properties.insert("amount".to_string(), PropertyValue::String(amount.to_string()));
                properties.insert("type".to_string(), PropertyValue::String(kind.to_string()));
            }
        }
        properties
    }

    /// Reads back an identifier and its properties. Unknown identifiers and
    /// malformed properties yield `None`.
    pub fn from_parts(parser: &str, properties: &Properties) -> Option<Self> {
        let get = |name: &str| properties.get(name);
        Some(match parser {
            "brigadier:bool" => ClientCompletionType::Bool,
            "brigadier:integer" => ClientCompletionType::Integer {
                min: get("min").and_then(PropertyValue::as_i64).map(|v| v as i32),
                max: get("max").and_then(PropertyValue::as_i64).map(|v| v as i32),
            },
            "brigadier:long" => ClientCompletionType::Long {
                min: get("min").and_then(PropertyValue::as_i64),
                max: get("max").and_then(PropertyValue::as_i64),
            },
            "brigadier:float" => ClientCompletionType::Float {
                min: get("min").and_then(PropertyValue::as_f64).map(|v| v as f32),
                max: get("max").and_then(PropertyValue::as_f64).map(|v| v as f32),
            },
            "brigadier:double" => ClientCompletionType::Double {
                min: get("min").and_then(PropertyValue::as_f64),
                max: get("max").and_then(PropertyValue::as_f64),
            },
            "brigadier:string" => {
                let kind = match get("type") {
                    Some(kind) => StringKind::from_name(kind.as_str()?)?,
                    None => StringKind::Word,
                };
                ClientCompletionType::String(kind)
            }
            "minecraft:entity" => ClientCompletionType::Entity {
                single: get("amount").and_then(PropertyValue::as_str) == Some("single"),
                players_only: get("type").and_then(PropertyValue::as_str) == Some("players"),
            },
            "minecraft:game_profile" => ClientCompletionType::GameProfile,
            _ => return None,
        })
    }

    pub fn to_wire(&self) -> CDeclareCommandsNodeParser {
        match self {
            ClientCompletionType::Bool => CDeclareCommandsNodeParser::Bool,
            ClientCompletionType::Integer { min, max } => CDeclareCommandsNodeParser::Integer {
                min: *min,
                max: *max,
            },
            ClientCompletionType::Long { min, max } => CDeclareCommandsNodeParser::Long {
                min: *min,
                max: *max,
            },
            ClientCompletionType::Float { min, max } => CDeclareCommandsNodeParser::Float {
                min: *min,
                max: *max,
            },
            ClientCompletionType::Double { min, max } => CDeclareCommandsNodeParser::Double {
                min: *min,
                max: *max,
            },
            ClientCompletionType::String(kind) => CDeclareCommandsNodeParser::String(kind.id()),
            ClientCompletionType::Entity {
                single,
                players_only,
            } => CDeclareCommandsNodeParser::Entity {
                single: *single,
                players_only: *players_only,
            },
            ClientCompletionType::GameProfile => CDeclareCommandsNodeParser::GameProfile,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A flag that is set by being present, whatever its value.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

/// Argument nodes need a parser; everything else is checked by serde.
fn check_parsers(node: &CommandTreeNode, path: &mut Vec<String>) -> Result<(), String> {
    if node.node_type == NodeType::Argument && node.parser.is_none() {
        return Err(format!("argument /{} has no parser", path.join(" ")));
    }
    for (name, child) in &node.children {
        path.push(name.clone());
        check_parsers(child, path)?;
        path.pop();
    }
    Ok(())
}

/// One node of the client command tree, in the shape of its JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTreeNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, CommandTreeNode>,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "present")]
    pub executable: bool,
    /// Path from the root to the redirect target; empty for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom_suggestions: bool,
}

impl CommandTreeNode {
    pub fn root() -> Self {
        Self::new(NodeType::Root)
    }

    fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            children: IndexMap::new(),
            executable: false,
            redirect: None,
            parser: None,
            properties: Properties::new(),
            custom_suggestions: false,
        }
    }

    pub fn literal() -> Self {
        Self::new(NodeType::Literal)
    }

    pub fn argument(completion: &ClientCompletionType) -> Self {
        Self {
            parser: Some(completion.identifier().to_string()),
            properties: completion.properties(),
            ..Self::new(NodeType::Argument)
        }
    }

    /// The part of the dispatcher's tree `cause` is allowed to use.
    pub fn from_dispatcher(dispatcher: &CommandDispatcher, cause: &CommandCause) -> Self {
        describe(dispatcher.tree(), dispatcher.root(), cause)
    }

    pub fn completion_type(&self) -> Option<ClientCompletionType> {
        ClientCompletionType::from_parts(self.parser.as_deref()?, &self.properties)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Reads a tree from JSON. `executable` counts as set whenever the key is
    /// present, and every argument node must name a parser.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let tree: CommandTreeNode = serde_json::from_str(json)?;
        check_parsers(&tree, &mut Vec::new())
            .map_err(<serde_json::Error as serde::de::Error>::custom)?;
        Ok(tree)
    }
}

fn describe(tree: &CommandTree, id: NodeId, cause: &CommandCause) -> CommandTreeNode {
    let node = tree.node(id);
    let mut description = match node.kind() {
        NodeKind::Root => CommandTreeNode::root(),
        NodeKind::Literal(_) => CommandTreeNode::literal(),
        NodeKind::Argument(parameter) => {
            let completion = parameter.client_completion();
            let mut description = CommandTreeNode::argument(
                completion
                    .as_ref()
                    .unwrap_or(&ClientCompletionType::String(StringKind::Word)),
            );
            description.custom_suggestions =
                parameter.has_custom_completer() || completion.is_none();
            description
        }
    };
    description.executable = node.is_executable();
    description.redirect = node.redirect().and_then(|target| tree.path(target));
    for child in node.children() {
        if tree.node(child).can_use(cause) {
            let name = tree.node(child).name().to_string();
            description.children.insert(name, describe(tree, child, cause));
        }
    }
    description
}
