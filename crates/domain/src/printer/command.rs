use std::time::Duration;

/// One transport write plus the pause the printer needs before the next write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandChunk {
    pub bytes: Vec<u8>,
    pub settle: Duration,
}

impl CommandChunk {
    pub fn new(bytes: impl Into<Vec<u8>>, settle: Duration) -> Self {
        Self {
            bytes: bytes.into(),
            settle,
        }
    }
}

/// Ordered writes produced for one print call.
///
/// Chunks are written in order, each awaited, with `settle` slept after each one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedCommand {
    chunks: Vec<CommandChunk>,
}

impl EncodedCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(bytes: impl Into<Vec<u8>>, settle: Duration) -> Self {
        let mut cmd = Self::new();
        cmd.push(bytes, settle);
        cmd
    }

    pub fn push(&mut self, bytes: impl Into<Vec<u8>>, settle: Duration) {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            self.chunks.push(CommandChunk::new(bytes, settle));
        }
    }

    pub fn extend(&mut self, other: EncodedCommand) {
        self.chunks.extend(other.chunks);
    }

    pub fn chunks(&self) -> &[CommandChunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// All chunk bytes joined, for tests and spool files
    pub fn to_bytes(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect()
    }

    pub fn total_settle(&self) -> Duration {
        self.chunks.iter().map(|c| c.settle).sum()
    }
}

impl IntoIterator for EncodedCommand {
    type Item = CommandChunk;
    type IntoIter = std::vec::IntoIter<CommandChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}
