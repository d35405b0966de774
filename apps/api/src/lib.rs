pub mod analysis;
pub mod config;
pub mod errors;
pub mod intake;
pub mod llm_client;
pub mod models;
pub mod render;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
