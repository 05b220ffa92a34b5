pub mod app_config;
pub mod constants;
pub mod db;
pub mod identity;
pub mod middleware;
pub mod orm;
pub mod poll;
pub mod storage;
pub mod web;
