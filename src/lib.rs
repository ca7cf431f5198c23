pub mod cli_args;
pub mod club_report;
pub mod config;
pub mod dataset;
pub mod formation;
pub mod http_client;
pub mod image_fetch;
pub mod report_export;
pub mod season_report;
pub mod selection_cache;
pub mod squad;
