pub mod credential_store;
pub mod document_store;
pub mod error;
pub mod gemini_client;
pub mod soundscape;
pub mod storage;
