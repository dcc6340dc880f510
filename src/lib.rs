pub mod bracket;
pub mod cluster;
pub mod config;
pub mod derived;
pub mod error;
pub mod export;
pub mod injuries;
pub mod matchups;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod records;
pub mod schema;
pub mod snapshot;
pub mod table;
pub mod transactions;
