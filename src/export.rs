use std::num::NonZeroUsize;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    geometry::Polyline,
    reach::{AttributeValue, Reach},
};

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(200).unwrap();

/// One flat feature row: the attribute mapping plus the polyline, ready for
/// bulk load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub attributes: IndexMap<String, AttributeValue>,
    pub geometry: Polyline,
}

/// Lazy export over a fully materialized collection. Restartable: calling
/// again yields the same records in the same order, with no shared mutable
/// state between iterations.
pub fn export_records(reaches: &[Reach]) -> impl Iterator<Item = FeatureRecord> + '_ {
    reaches.iter().map(|reach| FeatureRecord {
        attributes: reach.attributes().clone(),
        geometry: reach.geometry().clone(),
    })
}

/// An ordered, size-bounded slice of records; exists only during submission.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatch {
    pub records: Vec<FeatureRecord>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Partition records into contiguous fixed-size batches, preserving order.
/// The last batch may be smaller. Purely mechanical slicing; retries and
/// pacing belong to the upload collaborator.
pub fn batch<I>(records: I, chunk_size: NonZeroUsize) -> Batches<I::IntoIter>
where
    I: IntoIterator<Item = FeatureRecord>,
{
    Batches {
        records: records.into_iter(),
        chunk_size: chunk_size.get(),
    }
}

pub struct Batches<I> {
    records: I,
    chunk_size: usize,
}

impl<I: Iterator<Item = FeatureRecord>> Iterator for Batches<I> {
    type Item = UploadBatch;

    fn next(&mut self) -> Option<Self::Item> {
        let mut records = Vec::with_capacity(self.chunk_size);
        while records.len() < self.chunk_size {
            match self.records.next() {
                Some(record) => records.push(record),
                None => break,
            }
        }
        if records.is_empty() {
            None
        } else {
            Some(UploadBatch { records })
        }
    }
}
