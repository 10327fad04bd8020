use std::fmt;
use std::future::Future;

use crate::error::EtlResult;

/// Pipeline stage a worker belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => f.write_str("extract"),
            Stage::Transform => f.write_str("transform"),
            Stage::Load => f.write_str("load"),
        }
    }
}

/// Identity of a worker, used in logs and failure reports.
///
/// Ids are 1-based within each stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WorkerType {
    /// Reads one key range from the source.
    Extractor { id: u16 },
    /// Applies the transformation between the two queues.
    Transformer { id: u16 },
    /// Batches records and writes them to the destination.
    Loader { id: u16 },
}

impl WorkerType {
    pub fn stage(&self) -> Stage {
        match self {
            WorkerType::Extractor { .. } => Stage::Extract,
            WorkerType::Transformer { .. } => Stage::Transform,
            WorkerType::Loader { .. } => Stage::Load,
        }
    }

    pub fn id(&self) -> u16 {
        match self {
            WorkerType::Extractor { id }
            | WorkerType::Transformer { id }
            | WorkerType::Loader { id } => *id,
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::Extractor { id } => write!(f, "extractor-{id}"),
            WorkerType::Transformer { id } => write!(f, "transformer-{id}"),
            WorkerType::Loader { id } => write!(f, "loader-{id}"),
        }
    }
}

/// A unit of work run on its own task inside a [`crate::workers::pool::WorkerPool`].
///
/// Returning an error other than [`crate::error::ErrorKind::Cancelled`] is reported as a stage
/// failure and cancels the run.
pub trait Worker {
    fn worker_type(&self) -> WorkerType;

    /// Runs the worker to completion.
    fn run(self) -> impl Future<Output = EtlResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_types_render_with_stage_prefix() {
        assert_eq!(WorkerType::Extractor { id: 1 }.to_string(), "extractor-1");
        assert_eq!(WorkerType::Loader { id: 2 }.to_string(), "loader-2");
        assert_eq!(WorkerType::Transformer { id: 3 }.stage(), Stage::Transform);
    }
}
