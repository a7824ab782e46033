pub mod error;

pub mod mmu;
pub mod pager;
pub mod storage;

pub mod config;
pub mod simulation;
pub mod workload;
