//! Data access for the HiAnime catalog: a timed response cache, a retrying
//! HTTP fetcher, a normalizing catalog client and load-state views.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod view;

#[cfg(test)]
mod testing;
