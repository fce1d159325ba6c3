//! Checkpoint encodings of a [`TreeSnapshot`].
//!
//! The format is picked at compile time through a marker type, so callers
//! write `tree.write_checkpoint::<CompressedCheckpoint, _>(file)`.

use crate::error::CheckpointError;
use crate::snapshot::TreeSnapshot;
use crate::tree::SpatialTree;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use tracing::debug;

/// Marker trait for checkpoint encodings
pub trait CheckpointFormat {
    /// Format name for logging
    const NAME: &'static str;

    const HUMAN_READABLE: bool;

    fn encode<T: Serialize, W: Write>(value: &T, writer: W) -> Result<(), CheckpointError>;

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T, CheckpointError>;
}

/// Plain JSON
#[derive(Debug, Clone, Copy)]
pub struct JsonCheckpoint;

impl CheckpointFormat for JsonCheckpoint {
    const NAME: &'static str = "JSON";
    const HUMAN_READABLE: bool = true;

    fn encode<T: Serialize, W: Write>(value: &T, writer: W) -> Result<(), CheckpointError> {
        serde_json::to_writer(writer, value)?;
        Ok(())
    }

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T, CheckpointError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Gzip-compressed JSON
#[derive(Debug, Clone, Copy)]
pub struct CompressedCheckpoint;

impl CheckpointFormat for CompressedCheckpoint {
    const NAME: &'static str = "gzip JSON";
    const HUMAN_READABLE: bool = false;

    fn encode<T: Serialize, W: Write>(value: &T, writer: W) -> Result<(), CheckpointError> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, value)?;
        encoder.finish()?;
        Ok(())
    }

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T, CheckpointError> {
        Ok(serde_json::from_reader(GzDecoder::new(reader))?)
    }
}

impl<const D: usize> SpatialTree<D> {
    pub fn write_checkpoint<F: CheckpointFormat, W: Write>(&self, writer: W) -> Result<(), CheckpointError> {
        F::encode(&self.save(), writer)?;
        debug!("💾 Wrote {} checkpoint of {} cells", F::NAME, self.cell_count());
        Ok(())
    }

    pub fn read_checkpoint<F: CheckpointFormat, R: Read>(reader: R) -> Result<Self, CheckpointError> {
        let snapshot: TreeSnapshot<D> = F::decode(reader)?;
        Ok(Self::restore(snapshot)?)
    }
}
