//! Server-pushed events and schema change descriptions.
//!
//! Events arrive on negative stream ids once the client has sent
//! `REGISTER`. The connection forwards them as raw frames; [`Event::parse`]
//! decodes the three v4 event kinds.

use std::fmt;
use std::net::SocketAddr;

use crate::codec::WireReader;
use crate::error::{CqlError, Result};
use crate::protocol::{Frame, Opcode};
use crate::result::ResponseBody;

/// Event kinds accepted by `REGISTER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    TopologyChange,
    StatusChange,
    SchemaChange,
}

impl EventType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::TopologyChange => "TOPOLOGY_CHANGE",
            EventType::StatusChange => "STATUS_CHANGE",
            EventType::SchemaChange => "SCHEMA_CHANGE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyChange {
    NewNode,
    RemovedNode,
    MovedNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaChangeType {
    Created,
    Updated,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaTarget {
    Keyspace,
    Table,
    Type,
    Function,
    Aggregate,
}

/// A schema change, carried by `SCHEMA_CHANGE` events and results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChange {
    pub change_type: SchemaChangeType,
    pub target: SchemaTarget,
    pub keyspace: String,
    /// Table, type, function or aggregate name; `None` for keyspaces.
    pub name: Option<String>,
    /// Argument types of a function or aggregate.
    pub arguments: Vec<String>,
}

impl SchemaChange {
    /// Read `<change_type><target><options>`.
    pub fn read(reader: &mut WireReader) -> Result<Self> {
        let change_type = match reader.read_string()?.as_str() {
            "CREATED" => SchemaChangeType::Created,
            "UPDATED" => SchemaChangeType::Updated,
            "DROPPED" => SchemaChangeType::Dropped,
            other => return Err(CqlError::decode(format!("unknown schema change type {:?}", other))),
        };
        let target = match reader.read_string()?.as_str() {
            "KEYSPACE" => SchemaTarget::Keyspace,
            "TABLE" => SchemaTarget::Table,
            "TYPE" => SchemaTarget::Type,
            "FUNCTION" => SchemaTarget::Function,
            "AGGREGATE" => SchemaTarget::Aggregate,
            other => return Err(CqlError::decode(format!("unknown schema change target {:?}", other))),
        };

        let keyspace = reader.read_string()?;
        let (name, arguments) = match target {
            SchemaTarget::Keyspace => (None, Vec::new()),
            SchemaTarget::Table | SchemaTarget::Type => (Some(reader.read_string()?), Vec::new()),
            SchemaTarget::Function | SchemaTarget::Aggregate => {
                (Some(reader.read_string()?), reader.read_string_list()?)
            }
        };

        Ok(Self {
            change_type,
            target,
            keyspace,
            name,
            arguments,
        })
    }
}

/// A decoded server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TopologyChange {
        change: TopologyChange,
        address: SocketAddr,
    },
    StatusChange {
        change: StatusChange,
        address: SocketAddr,
    },
    SchemaChange(SchemaChange),
}

impl Event {
    /// Decode an `EVENT` frame.
    pub fn parse(frame: &Frame) -> Result<Self> {
        if frame.opcode() != Opcode::Event {
            return Err(CqlError::Protocol(format!(
                "expected EVENT, got {}",
                frame.opcode()
            )));
        }

        let mut body = ResponseBody::open(frame)?;
        let reader = &mut body.reader;
        let event = match reader.read_string()?.as_str() {
            "TOPOLOGY_CHANGE" => {
                let change = match reader.read_string()?.as_str() {
                    "NEW_NODE" => TopologyChange::NewNode,
                    "REMOVED_NODE" => TopologyChange::RemovedNode,
                    "MOVED_NODE" => TopologyChange::MovedNode,
                    other => {
                        return Err(CqlError::decode(format!("unknown topology change {:?}", other)))
                    }
                };
                Event::TopologyChange {
                    change,
                    address: read_socket_addr(reader)?,
                }
            }
            "STATUS_CHANGE" => {
                let change = match reader.read_string()?.as_str() {
                    "UP" => StatusChange::Up,
                    "DOWN" => StatusChange::Down,
                    other => {
                        return Err(CqlError::decode(format!("unknown status change {:?}", other)))
                    }
                };
                Event::StatusChange {
                    change,
                    address: read_socket_addr(reader)?,
                }
            }
            "SCHEMA_CHANGE" => Event::SchemaChange(SchemaChange::read(reader)?),
            other => return Err(CqlError::unimplemented(format!("event type {:?}", other))),
        };
        Ok(event)
    }

    /// Kind of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            Event::TopologyChange { .. } => EventType::TopologyChange,
            Event::StatusChange { .. } => EventType::StatusChange,
            Event::SchemaChange(_) => EventType::SchemaChange,
        }
    }
}

fn read_socket_addr(reader: &mut WireReader) -> Result<SocketAddr> {
    let (ip, port) = reader.read_inet()?;
    let port = u16::try_from(port).map_err(|_| CqlError::decode(format!("invalid port {}", port)))?;
    Ok(SocketAddr::new(ip, port))
}
