//! Grounding pipeline: chunking, keyword retrieval, anchor repair and citation verification.

pub mod chunking;
pub mod fuzzy;
pub mod generation;
pub mod keywords;
pub mod normalize;
pub mod repair;
pub mod retrieval;
mod service;
pub mod types;
pub mod verify;

pub use chunking::{ChunkerConfig, chunk_text};
pub use generation::{build_context, parse_generation_response};
pub use keywords::extract_keywords;
pub use repair::repair_anchor;
pub use retrieval::{DEFAULT_TOP_N, Retrieval, RetrievedChunk, rank_chunks, retrieve_top_chunks};
pub use service::{GroundingApi, GroundingService};
pub use types::{
    ChunkingError, CitationCheck, ClaimReport, ClaimSummary, GeneratedClaim, GenerationOutput,
    IngestionError, IngestionOutcome, RetrievalError, Verification, VerificationError,
    VerificationStatus, VerifiedClaim,
};
pub use verify::{CitationVerifier, DEFAULT_FUZZY_THRESHOLD, DEFAULT_SEARCH_TIMEOUT, classify};
