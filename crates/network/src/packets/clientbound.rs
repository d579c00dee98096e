use super::{DecodeResult, PacketDecodeError, PacketDecoderExt, PacketEncoder, PacketEncoderExt};
use std::io::Cursor;

pub trait ClientBoundPacket {
    fn encode(&self) -> PacketEncoder;
}

const NUMBER_HAS_MIN: i8 = 0x01;
const NUMBER_HAS_MAX: i8 = 0x02;
const ENTITY_SINGLE: i8 = 0x01;
const ENTITY_PLAYERS_ONLY: i8 = 0x02;

/// Client side parser of an argument node, written as the parser identifier
/// followed by the parser specific properties.
#[derive(Debug, Clone, PartialEq)]
pub enum CDeclareCommandsNodeParser {
    Bool,
    Integer { min: Option<i32>, max: Option<i32> },
    Long { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f32>, max: Option<f32> },
    Double { min: Option<f64>, max: Option<f64> },
    /// 0 = single word, 1 = quotable phrase, 2 = greedy phrase
    String(i32),
    Entity { single: bool, players_only: bool },
    GameProfile,
}

fn bound_flags(has_min: bool, has_max: bool) -> i8 {
    let mut flags = 0;
    if has_min {
        flags |= NUMBER_HAS_MIN;
    }
    if has_max {
        flags |= NUMBER_HAS_MAX;
    }
    flags
}

impl CDeclareCommandsNodeParser {
    pub fn identifier(&self) -> &'static str {
        use CDeclareCommandsNodeParser::*;
        match self {
            Bool => "brigadier:bool",
            Integer { .. } => "brigadier:integer",
            Long { .. } => "brigadier:long",
            Float { .. } => "brigadier:float",
            Double { .. } => "brigadier:double",
            String(_) => "brigadier:string",
            Entity { .. } => "minecraft:entity",
            GameProfile => "minecraft:game_profile",
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        use CDeclareCommandsNodeParser::*;
        buf.write_identifier(self.identifier());
        match self {
            Bool | GameProfile => {}
            Integer { min, max } => {
                buf.write_byte(bound_flags(min.is_some(), max.is_some()));
                if let Some(min) = min {
                    buf.write_int(*min);
                }
                if let Some(max) = max {
                    buf.write_int(*max);
                }
            }
            Long { min, max } => {
                buf.write_byte(bound_flags(min.is_some(), max.is_some()));
                if let Some(min) = min {
                    buf.write_long(*min);
                }
                if let Some(max) = max {
                    buf.write_long(*max);
                }
            }
            Float { min, max } => {
                buf.write_byte(bound_flags(min.is_some(), max.is_some()));
                if let Some(min) = min {
                    buf.write_float(*min);
                }
                if let Some(max) = max {
                    buf.write_float(*max);
                }
            }
            Double { min, max } => {
                buf.write_byte(bound_flags(min.is_some(), max.is_some()));
                if let Some(min) = min {
                    buf.write_double(*min);
                }
                if let Some(max) = max {
                    buf.write_double(*max);
                }
            }
            String(ty) => buf.write_varint(*ty),
            Entity {
                single,
                players_only,
            } => {
                let mut flags = 0;
                if *single {
                    flags |= ENTITY_SINGLE;
                }
                if *players_only {
                    flags |= ENTITY_PLAYERS_ONLY;
                }
                buf.write_byte(flags);
            }
        }
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> DecodeResult<Self> {
        use CDeclareCommandsNodeParser::*;
        let identifier = cursor.read_string()?;
        Ok(match identifier.as_str() {
            "brigadier:bool" => Bool,
            "brigadier:integer" => {
                let flags = cursor.read_byte()?;
                let min = flags & NUMBER_HAS_MIN != 0;
                let max = flags & NUMBER_HAS_MAX != 0;
                Integer {
                    min: if min { Some(cursor.read_int()?) } else { None },
                    max: if max { Some(cursor.read_int()?) } else { None },
                }
            }
            "brigadier:long" => {
                let flags = cursor.read_byte()?;
                let min = flags & NUMBER_HAS_MIN != 0;
                let max = flags & NUMBER_HAS_MAX != 0;
                Long {
                    min: if min { Some(cursor.read_long()?) } else { None },
                    max: if max { Some(cursor.read_long()?) } else { None },
                }
            }
            "brigadier:float" => {
                let flags = cursor.read_byte()?;
                let min = flags & NUMBER_HAS_MIN != 0;
                let max = flags & NUMBER_HAS_MAX != 0;
                Float {
                    min: if min { Some(cursor.read_float()?) } else { None },
                    max: if max { Some(cursor.read_float()?) } else { None },
                }
            }
            "brigadier:double" => {
                let flags = cursor.read_byte()?;
                let min = flags & NUMBER_HAS_MIN != 0;
                let max = flags & NUMBER_HAS_MAX != 0;
                Double {
                    min: if min { Some(cursor.read_double()?) } else { None },
                    max: if max { Some(cursor.read_double()?) } else { None },
                }
            }
            "brigadier:string" => String(cursor.read_varint()?),
            "minecraft:entity" => {
                let flags = cursor.read_byte()?;
                Entity {
                    single: flags & ENTITY_SINGLE != 0,
                    players_only: flags & ENTITY_PLAYERS_ONLY != 0,
                }
            }
            "minecraft:game_profile" => GameProfile,
            other => {
                return Err(PacketDecodeError::Malformed(format!(
                    "unknown argument parser {other}"
                )));
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CCommandsNode {
    pub flags: i8,
    pub children: Vec<i32>,
    pub redirect_node: Option<i32>,
    pub name: Option<String>,
    pub parser: Option<CDeclareCommandsNodeParser>,
    pub suggestions_type: Option<String>,
}

const NODE_TYPE_MASK: i8 = 0x03;
const NODE_TYPE_ARGUMENT: i8 = 0x02;
const NODE_HAS_REDIRECT: i8 = 0x08;
const NODE_HAS_SUGGESTIONS_TYPE: i8 = 0x10;

fn read_count(cursor: &mut Cursor<&[u8]>) -> DecodeResult<i32> {
    let count = cursor.read_varint()?;
    if count < 0 {
        return Err(PacketDecodeError::Malformed(format!("negative count {count}")));
    }
    Ok(count)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CCommands {
    pub nodes: Vec<CCommandsNode>,
    pub root_index: i32,
}

impl CCommands {
    /// Reads back a packet body produced by [`CCommands::encode`].
    pub fn decode(body: &[u8]) -> DecodeResult<CCommands> {
        let mut cursor = Cursor::new(body);
        // Counts come off the wire, nothing is reserved up front.
        let count = read_count(&mut cursor)?;
        let mut nodes = Vec::new();
        for _ in 0..count {
            let flags = cursor.read_byte()?;
            let child_count = read_count(&mut cursor)?;
            let mut children = Vec::new();
            for _ in 0..child_count {
                children.push(cursor.read_varint()?);
            }
            let redirect_node = if flags & NODE_HAS_REDIRECT != 0 {
                Some(cursor.read_varint()?)
            } else {
                None
            };
            let name = if flags & NODE_TYPE_MASK != 0 {
                Some(cursor.read_string()?)
            } else {
                None
            };
            let parser = if flags & NODE_TYPE_MASK == NODE_TYPE_ARGUMENT {
                Some(CDeclareCommandsNodeParser::read(&mut cursor)?)
            } else {
                None
            };
            let suggestions_type = if flags & NODE_HAS_SUGGESTIONS_TYPE != 0 {
                Some(cursor.read_string()?)
            } else {
                None
            };
            nodes.push(CCommandsNode {
                flags,
                children,
                redirect_node,
                name,
                parser,
                suggestions_type,
            });
        }
        let root_index = cursor.read_varint()?;
        Ok(CCommands { nodes, root_index })
    }
}

impl ClientBoundPacket for CCommands {
    fn encode(&self) -> PacketEncoder {
        let mut buf = Vec::new();
        buf.write_varint(self.nodes.len() as i32);
        for node in &self.nodes {
            buf.write_byte(node.flags);
            buf.write_varint(node.children.len() as i32);
            for child in &node.children {
                buf.write_varint(*child);
            }
            if let Some(redirect_node) = node.redirect_node {
                buf.write_varint(redirect_node);
            }
            if let Some(name) = &node.name {
                buf.write_string(32767, name);
            }
            if let Some(parser) = &node.parser {
                parser.write(&mut buf);
            }
            if let Some(suggestions_type) = &node.suggestions_type {
                buf.write_identifier(suggestions_type);
            }
        }
        buf.write_varint(self.root_index);
        PacketEncoder::new(buf, 0x11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_parser_writes_only_present_bounds() {
        let mut buf = Vec::new();
        CDeclareCommandsNodeParser::Integer {
            min: Some(1),
            max: None,
        }
        .write(&mut buf);

        let mut expected = Vec::new();
        expected.write_identifier("brigadier:integer");
        expected.extend_from_slice(&[0x01, 0, 0, 0, 1]);
        assert_eq!(buf, expected);
    }

    #[test]
    fn entity_parser_flags() {
        let mut buf = Vec::new();
        CDeclareCommandsNodeParser::Entity {
            single: true,
            players_only: true,
        }
        .write(&mut buf);
        assert_eq!(buf.last(), Some(&0x03));
    }

    #[test]
    fn literal_tree_layout() {
        let packet = CCommands {
            nodes: vec![
                CCommandsNode {
                    flags: 0x00,
                    children: vec![1],
                    redirect_node: None,
                    name: None,
                    parser: None,
                    suggestions_type: None,
                },
                CCommandsNode {
                    flags: 0x05,
                    children: vec![],
                    redirect_node: None,
                    name: Some("stop".to_string()),
                    parser: None,
                    suggestions_type: None,
                },
            ],
            root_index: 0,
        };
        let encoded = packet.encode();
        assert_eq!(encoded.packet_id(), 0x11);
        assert_eq!(
            encoded.buffer(),
            &[2, 0x00, 1, 1, 0x05, 0, 4, b's', b't', b'o', b'p', 0]
        );
        assert_eq!(CCommands::decode(encoded.buffer()).unwrap(), packet);
    }

    #[test]
    fn oversized_counts_fail_cleanly() {
        // Claims i32::MAX nodes but carries none.
        assert!(CCommands::decode(&[0xff, 0xff, 0xff, 0xff, 0x07]).is_err());
        // One root node claiming i32::MAX children.
        assert!(CCommands::decode(&[1, 0x00, 0xff, 0xff, 0xff, 0xff, 0x07]).is_err());
        assert!(matches!(
            CCommands::decode(&[0xff, 0xff, 0xff, 0xff, 0x0f]),
            Err(PacketDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_body_fails() {
        let packet = CCommands {
            nodes: vec![CCommandsNode {
                flags: 0x01,
                children: vec![],
                redirect_node: None,
                name: Some("stop".to_string()),
                parser: None,
                suggestions_type: None,
            }],
            root_index: 0,
        };
        let encoded = packet.encode();
        let body = encoded.buffer();
        for len in 0..body.len() {
            assert!(CCommands::decode(&body[..len]).is_err(), "prefix of {len} bytes");
        }
    }
}
