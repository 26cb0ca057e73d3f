// Crate root: declare modules and control visibility
pub mod cache;
pub mod config;
pub mod disasm_serializer;
pub mod engine_client;
pub mod error;
pub mod indexer;
pub mod instr;
pub mod instrdb;
pub mod local;
pub mod model;
pub mod protocol;
pub mod request_handler;
pub mod search;
pub mod service;
pub mod symbols;
pub mod transport;
pub mod traversal;
pub mod utils;

// Re-export commonly used API from the library for binaries/tests
pub use error::{ResponseError, ServiceError};
pub use indexer::index_binary;
pub use instr::{BasicBlock, Instruction};
pub use instrdb::InstructionIndex;
pub use search::run_query_loop;
pub use service::{DisassemblerService, SessionConfig};
pub use traversal::{build_index, TraversalOptions, TraversalStats, UndecodablePolicy};
