pub mod compare;
pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
#[cfg(test)]
pub mod testing;
pub mod tracking;
