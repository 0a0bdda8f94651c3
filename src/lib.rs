pub mod audit;
pub mod config;
pub mod enrich;
pub mod git_sink;
pub mod hit_rate;
pub mod leg_text;
pub mod logging;
pub mod pipeline;
pub mod publish;
pub mod rank;
pub mod series;
pub mod slips;
pub mod stat_eval;
