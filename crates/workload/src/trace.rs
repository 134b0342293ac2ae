//! On-disk workload traces.
//!
//! A trace is a flat little-endian sequence of 8-byte records, each a pair
//! of `u32`s. A batch is a header record `(op_kind, count)` followed by
//! `count` operand records. For LINK the operands are `(child, parent)`,
//! for LOOKUP `(node, expected_root)`, for CUT only the first field is used.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

const RECORD_BYTES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Lookup,
    Link,
    Cut,
}

impl OpKind {
    pub fn code(self) -> u32 {
        match self {
            Self::Lookup => 0,
            Self::Link => 1,
            Self::Cut => 2,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Lookup),
            1 => Some(Self::Link),
            2 => Some(Self::Cut),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot access trace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("trace is {len} bytes, not a multiple of {RECORD_BYTES}")]
    Misaligned { len: u64 },
    #[error("record {index}: unknown op kind {code}")]
    UnknownOp { index: usize, code: u32 },
    #[error("record {index}: batch of {count} operations overruns the trace")]
    Truncated { index: usize, count: u32 },
}

/// A workload trace held in memory as its raw record stream.
///
/// Batches are appended through [`push_batch`](Self::push_batch) and the
/// stream is validated on [`read_from`](Self::read_from), so iteration
/// never sees a malformed header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    records: Vec<(u32, u32)>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push_batch(&mut self, kind: OpKind, ops: &[(u32, u32)]) {
        self.records.push((kind.code(), ops.len() as u32));
        self.records.extend_from_slice(ops);
    }

    pub fn batches(&self) -> Batches<'_> {
        Batches {
            records: &self.records,
            index: 0,
        }
    }

    pub fn read_from(path: &Path) -> Result<Self, TraceError> {
        let bytes = fs::read(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.len() % RECORD_BYTES != 0 {
            return Err(TraceError::Misaligned {
                len: bytes.len() as u64,
            });
        }
        let records = bytes
            .chunks_exact(RECORD_BYTES)
            .map(|chunk| {
                let a = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let b = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
                (a, b)
            })
            .collect();
        let trace = Self { records };
        trace.check()?;
        Ok(trace)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), TraceError> {
        let mut bytes = Vec::with_capacity(self.records.len() * RECORD_BYTES);
        for &(a, b) in &self.records {
            bytes.extend_from_slice(&a.to_le_bytes());
            bytes.extend_from_slice(&b.to_le_bytes());
        }
        fs::write(path, bytes).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn check(&self) -> Result<(), TraceError> {
        let mut index = 0;
        while index < self.records.len() {
            let (code, count) = self.records[index];
            OpKind::from_code(code).ok_or(TraceError::UnknownOp { index, code })?;
            let end = index + 1 + count as usize;
            if end > self.records.len() {
                return Err(TraceError::Truncated { index, count });
            }
            index = end;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Batch<'a> {
    pub kind: OpKind,
    pub ops: &'a [(u32, u32)],
}

pub struct Batches<'a> {
    records: &'a [(u32, u32)],
    index: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.records.len() {
            return None;
        }
        let (code, count) = self.records[self.index];
        let kind = OpKind::from_code(code).expect("trace validated on construction");
        let start = self.index + 1;
        let end = start + count as usize;
        debug_assert!(end <= self.records.len());
        self.index = end;
        Some(Batch {
            kind,
            ops: &self.records[start..end],
        })
    }
}

/// Workload kind, the first token of a trace file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceKind {
    Link,
    Lookup,
    Cut,
    Lca,
}

impl TraceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Lookup => "lookup",
            Self::Cut => "cut",
            Self::Lca => "lca",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "link" => Some(Self::Link),
            "lookup" => Some(Self::Lookup),
            "cut" => Some(Self::Cut),
            "lca" => Some(Self::Lca),
            _ => None,
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("cannot parse trace name {name:?}, expected <type>-<shape>-<beta>-<n>.bin")]
pub struct BadTraceName {
    name: String,
}

/// Parameters encoded in a trace file name, `<type>-<shape>-<beta>-<n>.bin`.
///
/// The shape itself may contain `-` (`2-ary`), so the name is tokenized
/// from both ends: first token is the kind, the last two are node count and
/// batch size, everything between is the shape label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceMeta {
    pub kind: TraceKind,
    pub shape: String,
    pub beta: u32,
    pub n: u32,
}

impl TraceMeta {
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}-{}.bin", self.kind, self.shape, self.beta, self.n)
    }

    pub fn from_path(path: &Path) -> Result<Self, BadTraceName> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let bad = || BadTraceName {
            name: name.to_string(),
        };
        let stem = name.strip_suffix(".bin").ok_or_else(bad)?;
        let tokens: Vec<&str> = stem.split('-').collect();
        if tokens.len() < 4 {
            return Err(bad());
        }
        let kind = TraceKind::from_label(tokens[0]).ok_or_else(bad)?;
        let n = u32::from_str(tokens[tokens.len() - 1]).map_err(|_| bad())?;
        let beta = u32::from_str(tokens[tokens.len() - 2]).map_err(|_| bad())?;
        let shape = tokens[1..tokens.len() - 2].join("-");
        Ok(Self {
            kind,
            shape,
            beta,
            n,
        })
    }
}
