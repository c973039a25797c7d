//! Runtime state of the target daemon
//!
//! The kernel module exposes its live configuration under `/proc/net/iet`:
//!
//! ```text
//! # /proc/net/iet/volume
//! tid:1 name:iqn.2001-04.com.example:storage.disk1
//! 	lun:0 state:0 iotype:fileio iomode:wt blocks:2097152 blocksize:512 path:/srv/disk1.img
//!
//! # /proc/net/iet/session
//! tid:1 name:iqn.2001-04.com.example:storage.disk1
//! 	sid:281474997486080 initiator:iqn.1993-08.org.debian:01:9a2b
//! 		cid:0 ip:192.168.0.10 state:active hd:none dd:none
//! ```
//!
//! Records are whitespace-separated `key:value` fields; nesting is expressed
//! with leading tabs.

use crate::backend::StorageBackend;
use crate::error::{IetError, IetResult};

/// One line of `key:value` fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcRecord {
    pub fields: Vec<(String, String)>,
}

impl ProcRecord {
    fn parse(line: &str) -> IetResult<Self> {
        let fields = line
            .split_whitespace()
            .map(|field| {
                field
                    .split_once(':')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| IetError::Parser(format!("Expected key:value, got {:?}", field)))
            })
            .collect::<IetResult<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &str) -> IetResult<&str> {
        self.get(key)
            .ok_or_else(|| IetError::Parser(format!("Record is missing {:?}: {:?}", key, self.fields)))
    }
}

/// A target with its LUNs, from `/proc/net/iet/volume`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeTarget {
    pub tid: u32,
    pub name: String,
    /// `lun`, `state`, `iotype`, `iomode`, `blocks`, `blocksize`, `path`
    pub luns: Vec<ProcRecord>,
}

/// An initiator session and its connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub sid: u64,
    pub initiator: String,
    /// `cid`, `ip`, `state`, `hd`, `dd`
    pub connections: Vec<ProcRecord>,
}

/// A target with its sessions, from `/proc/net/iet/session`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub tid: u32,
    pub name: String,
    pub sessions: Vec<Session>,
}

/// Parsed target header with its nested records
struct Node {
    tid: u32,
    name: String,
    children: Vec<(ProcRecord, Vec<ProcRecord>)>,
}

/// Reader for `/proc/net/iet/volume` and `/proc/net/iet/session`
pub struct ProcParser<B: StorageBackend> {
    backend: B,
    tid_index: bool,
}

impl<B: StorageBackend> ProcParser<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tid_index: false,
        }
    }

    /// Match the `target` filter against the numeric tid instead of the IQN
    pub fn set_tid_index(&mut self, tid_index: bool) -> &mut Self {
        self.tid_index = tid_index;
        self
    }

    pub fn tid_index(&self) -> bool {
        self.tid_index
    }

    /// Targets and LUNs from a volume file, optionally a single target
    pub fn volumes(&self, target: Option<&str>) -> IetResult<Vec<VolumeTarget>> {
        let nodes = self.load(target)?;
        Ok(nodes
            .into_iter()
            .map(|node| VolumeTarget {
                tid: node.tid,
                name: node.name,
                luns: node.children.into_iter().map(|(lun, _)| lun).collect(),
            })
            .collect())
    }

    /// Targets and sessions from a session file, optionally a single target
    pub fn sessions(&self, target: Option<&str>) -> IetResult<Vec<SessionTarget>> {
        let nodes = self.load(target)?;
        let mut targets = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut sessions = Vec::with_capacity(node.children.len());
            for (record, connections) in node.children {
                let sid = record.require("sid")?;
                let sid = sid
                    .parse()
                    .map_err(|_| IetError::Parser(format!("Invalid sid {:?}", sid)))?;
                sessions.push(Session {
                    sid,
                    initiator: record.require("initiator")?.to_string(),
                    connections,
                });
            }
            targets.push(SessionTarget {
                tid: node.tid,
                name: node.name,
                sessions,
            });
        }
        Ok(targets)
    }

    fn load(&self, target: Option<&str>) -> IetResult<Vec<Node>> {
        let text = self.backend.content()?;
        let nodes = parse_nodes(&text)?;
        log::debug!(
            "Parsed {} targets from {}",
            nodes.len(),
            self.backend.path().display()
        );

        Ok(match target {
            None => nodes,
            Some(wanted) => nodes
                .into_iter()
                .filter(|node| {
                    if self.tid_index {
                        node.tid.to_string() == wanted
                    } else {
                        node.name == wanted
                    }
                })
                .collect(),
        })
    }
}

fn parse_nodes(text: &str) -> IetResult<Vec<Node>> {
    let mut nodes: Vec<Node> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let depth = match line.chars().take_while(|c| *c == '\t').count() {
            0 if line.starts_with(char::is_whitespace) => 1,
            tabs => tabs,
        };
        let record = ProcRecord::parse(line)?;

        match depth {
            0 => {
                let tid = record.require("tid")?;
                let tid = tid
                    .parse()
                    .map_err(|_| IetError::Parser(format!("Invalid tid {:?}", tid)))?;
                nodes.push(Node {
                    tid,
                    name: record.require("name")?.to_string(),
                    children: Vec::new(),
                });
            }
            1 => {
                let node = nodes.last_mut().ok_or_else(|| {
                    IetError::Parser(format!("Record outside of a target: {:?}", line))
                })?;
                node.children.push((record, Vec::new()));
            }
            _ => {
                let parent = nodes
                    .last_mut()
                    .and_then(|node| node.children.last_mut())
                    .ok_or_else(|| {
                        IetError::Parser(format!("Nested record without parent: {:?}", line))
                    })?;
                parent.1.push(record);
            }
        }
    }

    Ok(nodes)
}
