//! The text command language: `kill`, `damage 5`, `give wood 10`, `tp 100 200`...
//!
//! A command line is parsed client-side into a verb and positional arguments
//! and sent as a `Command` packet. The server turns it into a typed
//! [`Command`] before dispatching.

use crate::catalog::{Biome, EntityType, ItemType, TechType};
use crate::codec::{CodecError, PacketReader, PacketWriter};
use thiserror::Error;

pub const DEFAULT_DAMAGE: f32 = 10.0;
pub const DEFAULT_HEAL: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownVerb(String),
    #[error("'{verb}' is missing argument <{name}>")]
    MissingArgument { verb: &'static str, name: &'static str },
    #[error("'{verb}' got invalid <{name}>: {value}")]
    InvalidArgument {
        verb: &'static str,
        name: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandArg {
    Number(f32),
    Text(String),
}

impl CommandArg {
    fn parse(token: &str) -> Self {
        match token.parse::<f32>() {
            Ok(number) if number.is_finite() => CommandArg::Number(number),
            _ => CommandArg::Text(token.to_string()),
        }
    }

    fn describe(&self) -> String {
        match self {
            CommandArg::Number(n) => n.to_string(),
            CommandArg::Text(t) => t.clone(),
        }
    }
}

/// A verb plus positional arguments, as carried by the `Command` packet.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPacket {
    pub verb: String,
    pub args: Vec<CommandArg>,
}

const ARG_NUMBER: u32 = 0;
const ARG_TEXT: u32 = 1;

impl CommandPacket {
    pub fn write_to(&self, writer: &mut PacketWriter) -> Result<(), CodecError> {
        writer.write_string(&self.verb)?;
        writer.write_u32(self.args.len() as u32);
        for arg in &self.args {
            match arg {
                CommandArg::Number(n) => {
                    writer.write_u32(ARG_NUMBER);
                    writer.write_f32(*n);
                }
                CommandArg::Text(t) => {
                    writer.write_u32(ARG_TEXT);
                    writer.write_string(t)?;
                }
            }
        }
        Ok(())
    }

    pub fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        let verb = reader.read_string()?;
        let count = reader.read_count(8)?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let arg = match reader.read_u32()? {
                ARG_NUMBER => CommandArg::Number(reader.read_f32()?),
                ARG_TEXT => CommandArg::Text(reader.read_string()?),
                value => {
                    return Err(CodecError::InvalidValue {
                        field: "command argument kind",
                        value,
                    })
                }
            };
            args.push(arg);
        }
        Ok(Self { verb, args })
    }
}

/// Splits a command line on whitespace. A leading `/` is optional.
pub fn parse_command_line(line: &str) -> Result<CommandPacket, CommandError> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut tokens = line.split_whitespace();
    let verb = tokens.next().ok_or(CommandError::Empty)?.to_lowercase();
    let args = tokens.map(CommandArg::parse).collect();
    Ok(CommandPacket { verb, args })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Kill,
    Damage { amount: f32 },
    Heal { amount: f32 },
    Give { item: ItemType, amount: u32 },
    Teleport { x: f32, y: f32 },
    TeleportBiome { biome: Biome },
    Summon { entity_type: EntityType, amount: u32 },
    Research { tech: TechType },
    ClearInventory,
}

struct Args<'a> {
    verb: &'static str,
    args: &'a [CommandArg],
}

impl<'a> Args<'a> {
    fn number(&self, index: usize, name: &'static str) -> Result<Option<f32>, CommandError> {
        match self.args.get(index) {
            None => Ok(None),
            Some(CommandArg::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(CommandError::InvalidArgument {
                verb: self.verb,
                name,
                value: other.describe(),
            }),
        }
    }

    fn required_number(&self, index: usize, name: &'static str) -> Result<f32, CommandError> {
        self.number(index, name)?.ok_or(CommandError::MissingArgument {
            verb: self.verb,
            name,
        })
    }

    fn count(&self, index: usize, name: &'static str) -> Result<u32, CommandError> {
        match self.number(index, name)? {
            None => Ok(1),
            Some(n) if n >= 1.0 && n.fract() == 0.0 => Ok(n as u32),
            Some(n) => Err(CommandError::InvalidArgument {
                verb: self.verb,
                name,
                value: n.to_string(),
            }),
        }
    }

    fn positive(&self, index: usize, name: &'static str, default: f32) -> Result<f32, CommandError> {
        match self.number(index, name)? {
            None => Ok(default),
            Some(n) if n > 0.0 => Ok(n),
            Some(n) => Err(CommandError::InvalidArgument {
                verb: self.verb,
                name,
                value: n.to_string(),
            }),
        }
    }

    fn name<T>(
        &self,
        index: usize,
        name: &'static str,
        lookup: impl Fn(&str) -> Option<T>,
    ) -> Result<T, CommandError> {
        let arg = self.args.get(index).ok_or(CommandError::MissingArgument {
            verb: self.verb,
            name,
        })?;
        let found = match arg {
            CommandArg::Text(text) => lookup(&text.to_lowercase()),
            CommandArg::Number(_) => None,
        };
        found.ok_or_else(|| CommandError::InvalidArgument {
            verb: self.verb,
            name,
            value: arg.describe(),
        })
    }
}

impl Command {
    pub fn from_packet(packet: &CommandPacket) -> Result<Self, CommandError> {
        let verb = match packet.verb.as_str() {
            "kill" => "kill",
            "damage" => "damage",
            "heal" => "heal",
            "give" => "give",
            "tp" => "tp",
            "tpbiome" => "tpbiome",
            "summon" => "summon",
            "research" => "research",
            "clearinv" => "clearinv",
            "" => return Err(CommandError::Empty),
            other => return Err(CommandError::UnknownVerb(other.to_string())),
        };
        let args = Args {
            verb,
            args: &packet.args,
        };

        let command = match verb {
            "kill" => Command::Kill,
            "damage" => Command::Damage {
                amount: args.positive(0, "amount", DEFAULT_DAMAGE)?,
            },
            "heal" => Command::Heal {
                amount: args.positive(0, "amount", DEFAULT_HEAL)?,
            },
            "give" => Command::Give {
                item: args.name(0, "item", ItemType::from_name)?,
                amount: args.count(1, "amount")?,
            },
            "tp" => Command::Teleport {
                x: args.required_number(0, "x")?,
                y: args.required_number(1, "y")?,
            },
            "tpbiome" => Command::TeleportBiome {
                biome: args.name(0, "biome", Biome::from_name)?,
            },
            "summon" => Command::Summon {
                entity_type: args.name(0, "type", EntityType::from_name)?,
                amount: args.count(1, "amount")?,
            },
            "research" => Command::Research {
                tech: args.name(0, "tech", TechType::from_name)?,
            },
            _ => Command::ClearInventory,
        };
        Ok(command)
    }

    pub fn parse(line: &str) -> Result<Self, CommandError> {
        Self::from_packet(&parse_command_line(line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line_splits_args() {
        let packet = parse_command_line("/give wood 5").unwrap();
        assert_eq!(packet.verb, "give");
        assert_eq!(
            packet.args,
            vec![CommandArg::Text("wood".to_string()), CommandArg::Number(5.0)]
        );
        assert_eq!(parse_command_line("   "), Err(CommandError::Empty));
    }

    #[test]
    fn test_command_defaults() {
        assert_eq!(Command::parse("kill"), Ok(Command::Kill));
        assert_eq!(
            Command::parse("damage"),
            Ok(Command::Damage {
                amount: DEFAULT_DAMAGE
            })
        );
        assert_eq!(
            Command::parse("give raw_beef"),
            Ok(Command::Give {
                item: ItemType::RawBeef,
                amount: 1
            })
        );
        assert_eq!(
            Command::parse("summon COW 3"),
            Ok(Command::Summon {
                entity_type: EntityType::Cow,
                amount: 3
            })
        );
        assert_eq!(
            Command::parse("tp 10 -20.5"),
            Ok(Command::Teleport { x: 10.0, y: -20.5 })
        );
    }

    #[test]
    fn test_command_argument_errors() {
        assert_eq!(
            Command::parse("fly"),
            Err(CommandError::UnknownVerb("fly".to_string()))
        );
        assert!(matches!(
            Command::parse("tp 10"),
            Err(CommandError::MissingArgument { name: "y", .. })
        ));
        assert!(matches!(
            Command::parse("give diamond"),
            Err(CommandError::InvalidArgument { name: "item", .. })
        ));
        assert!(matches!(
            Command::parse("give wood 1.5"),
            Err(CommandError::InvalidArgument { name: "amount", .. })
        ));
        assert!(matches!(
            Command::parse("heal -3"),
            Err(CommandError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_command_packet_wire_round_trip() {
        let packet = parse_command_line("tpbiome tundra 3").unwrap();
        let mut writer = PacketWriter::new(6);
        packet.write_to(&mut writer).unwrap();
        let encoded = writer.finish();

        let mut reader = encoded.reader();
        assert_eq!(CommandPacket::read_from(&mut reader).unwrap(), packet);
        assert!(reader.is_at_end());
    }
}
