//! BlueprintError: unified error type for mesh-blueprint public APIs.
//!
//! Every fallible public API returns `Result<_, BlueprintError>`. A second,
//! fatal channel exists for contract violations that have no sensible return
//! path (indexing sugar on a missing path, out-of-range accessor reads):
//! those are routed through a process-wide handler installed via
//! [`set_error_handler`]. The default handler panics with the message and
//! source location. Handler installation is intended to happen once at
//! process start and is not synchronized against concurrent fatal errors.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thiserror::Error;

use crate::node::dtype::DTypeId;

/// Unified error type for mesh-blueprint operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlueprintError {
    /// Strict accessor or typed read found a different leaf kind.
    #[error("type mismatch: requested {requested:?}, node holds {actual:?}")]
    TypeMismatch { requested: DTypeId, actual: DTypeId },
    /// Element index past the end of a leaf.
    #[error("index {index} out of bounds for leaf with {len} elements")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A `fetch` on a path with a missing segment.
    #[error("path `{0}` not found")]
    PathNotFound(String),
    /// Descended through a leaf while resolving a path.
    #[error("path `{0}` descends through a non-object node")]
    PathThroughLeaf(String),
    /// Strict slice view over a strided or byte-offset leaf.
    #[error("leaf data is not contiguous (offset {offset}, stride {stride})")]
    NonContiguous { offset: usize, stride: usize },
    /// A declared layout that does not fit inside the bound buffer.
    #[error("layout requires {required} bytes but buffer holds {available}")]
    LayoutOverrun { required: usize, available: usize },
    /// Read of typed data from an interior (object/list/empty) node.
    #[error("node is not a leaf (kind {0:?})")]
    NotALeaf(DTypeId),
    /// String read on a non-char8 leaf or invalid UTF-8 payload.
    #[error("node does not hold a valid string")]
    NotAString,
    /// Expected child is absent.
    #[error("expected child `{0}`")]
    MissingChild(String),
    /// Duplicate name handed to an object node.
    #[error("object already has a child named `{0}`")]
    DuplicateChildName(String),
    /// Canonical-text parse failure.
    #[error("parse error: {0}")]
    Parse(String),
    /// Input tree does not conform to the blueprint protocol the
    /// operation requires (converters, generators, the partition driver).
    #[error("non-conforming input: {0}")]
    NonConforming(String),
    /// A topology references a coordset (or vice versa) that is absent.
    #[error("dangling reference: {0}")]
    DanglingReference(String),
    /// Failure reported by the external graph partitioner.
    #[error("partitioner error: {0}")]
    Partitioner(String),
    /// Failure in the parallel transport layer.
    #[error("communicator error: {0}")]
    Comm(String),
}

/// Signature of the process-wide fatal-error handler.
pub type ErrorHandler = fn(msg: &str, file: &str, line: u32);

/// Default handler: panic with the message and source location.
pub fn default_error_handler(msg: &str, file: &str, line: u32) {
    panic!("[{file}:{line}] fatal: {msg}");
}

static ERROR_HANDLER: Lazy<RwLock<ErrorHandler>> =
    Lazy::new(|| RwLock::new(default_error_handler as ErrorHandler));

/// Install a replacement fatal-error handler.
///
/// Intended to be called once at process start. If the installed handler
/// returns instead of diverging, the calling operation still aborts via
/// panic, since fatal call sites have no value to produce.
pub fn set_error_handler(handler: ErrorHandler) {
    *ERROR_HANDLER.write() = handler;
}

/// Restore the default panicking handler.
pub fn reset_error_handler() {
    *ERROR_HANDLER.write() = default_error_handler as ErrorHandler;
}

/// Route a fatal condition through the installed handler.
pub(crate) fn fatal(msg: &str, file: &str, line: u32) -> ! {
    let handler = *ERROR_HANDLER.read();
    handler(msg, file, line);
    // A handler that logs and returns cannot resume the operation.
    panic!("[{file}:{line}] fatal: {msg}");
}

macro_rules! fatal_error {
    ($($arg:tt)*) => {
        $crate::error::fatal(&format!($($arg)*), file!(), line!())
    };
}
pub(crate) use fatal_error;
