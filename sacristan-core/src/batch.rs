use crate::{DocumentId, DocumentStore, Fields, Result};

/// A single write inside a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set {
        collection: String,
        id: DocumentId,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: DocumentId,
    },
}

/// An ordered set of writes the store applies atomically.
///
/// The backend caps a batch at [WriteBatch::MAX_OPS] operations. Larger
/// write sets are not atomic; they are split with [WriteBatch::chunks] and
/// committed one batch at a time.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// The fixed per-batch operation cap of the backing store.
    pub const MAX_OPS: usize = 500;

    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a create-or-replace of a single document.
    pub fn set(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<DocumentId>,
        fields: Fields,
    ) {
        self.ops.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
    }

    /// Queues a delete of a single document.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<DocumentId>) {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Splits the batch into batches that each respect the per-batch cap,
    /// preserving operation order.
    pub fn chunks(self) -> Vec<WriteBatch> {
        if self.ops.len() <= Self::MAX_OPS {
            return vec![self];
        }

        let mut chunks = vec![];
        let mut ops = self.ops.into_iter().peekable();

        while ops.peek().is_some() {
            chunks.push(WriteBatch {
                ops: ops.by_ref().take(Self::MAX_OPS).collect(),
            });
        }

        chunks
    }
}

/// Commits a write set of any size by splitting it into store-sized batches.
/// Atomicity only holds within each chunk.
pub async fn commit_in_chunks<S>(store: &S, batch: WriteBatch) -> Result<()>
where
    S: DocumentStore + ?Sized,
{
    for chunk in batch.chunks() {
        if chunk.is_empty() {
            continue;
        }

        store.commit(chunk).await?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn batch_of(size: usize) -> WriteBatch {
        let mut batch = WriteBatch::new();

        for index in 0..size {
            batch.set("entries", index.to_string(), Fields::new());
        }

        batch
    }

    #[test]
    fn small_batches_stay_whole() {
        assert_eq!(batch_of(0).chunks().len(), 1);
        assert_eq!(batch_of(1).chunks().len(), 1);
        assert_eq!(batch_of(WriteBatch::MAX_OPS).chunks().len(), 1);
    }

    #[test]
    fn oversized_batches_split_at_the_cap() {
        let chunks = batch_of(WriteBatch::MAX_OPS + 1).chunks();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), WriteBatch::MAX_OPS);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn splitting_preserves_order() {
        let chunks = batch_of(WriteBatch::MAX_OPS * 2 + 3).chunks();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 3);

        let ids: Vec<String> = chunks
            .into_iter()
            .flat_map(|chunk| chunk.into_ops())
            .map(|op| match op {
                WriteOp::Set { id, .. } => id,
                WriteOp::Delete { id, .. } => id,
            })
            .collect();

        let expected: Vec<String> = (0..WriteBatch::MAX_OPS * 2 + 3)
            .map(|index| index.to_string())
            .collect();

        assert_eq!(ids, expected);
    }
}
