//! Scripted transport for unit tests.
use std::collections::VecDeque;

use anyhow::Result;

use super::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(u8, Vec<u8>),
    Read(u8, usize),
}

/// Records every transfer; reads are served from a byte script and
/// zero-filled once it runs dry, like a silent device.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub ops: Vec<Op>,
    script: VecDeque<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(bytes: &[u8]) -> Self {
        MockTransport {
            ops: Vec::new(),
            script: bytes.iter().copied().collect(),
        }
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Write(_, bytes) => Some(bytes.clone()),
                Op::Read(..) => None,
            })
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Read(..))).count()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        self.ops.push(Op::Write(addr, bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        self.ops.push(Op::Read(addr, buf.len()));
        for b in buf.iter_mut() {
            *b = self.script.pop_front().unwrap_or(0);
        }
        Ok(())
    }
}
