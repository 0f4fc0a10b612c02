pub mod credential_gate;
pub mod fallback;
pub mod generation;
pub mod identity;
pub mod orchestrator;
pub mod retrieval;
pub mod user_store;
