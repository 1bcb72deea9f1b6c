/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The chainlet module: lifecycle and cross-chain upgrades of chainlets, the child chains secured by
//! the parent chain's validator set.
//!
//! The module keeps a registry of deployable [stacks](stack_registry) and of launched
//! [chainlets](chainlet_registry), registers chainlets as [consumers](consumer) of the parent's
//! validator set, negotiates breaking [upgrades](upgrade) with running chainlets over packets, and
//! [automatically](scheduler) moves opted-in chainlets to newer compatible versions.
//!
//! Hosts drive the module through a [`Controller`](controller::Controller), handing it a
//! [`Context`](state::Context) over their key-value store for every execution.

pub mod chainlet_registry;

pub mod collaborators;

pub mod config;

pub mod consumer;

pub mod controller;

pub mod error;

pub mod events;

pub mod genesis;

pub mod logging;

pub mod msgs;

pub mod query;

pub mod scheduler;

pub mod stack_registry;

pub mod state;

pub mod types;

pub mod upgrade;

pub mod version_tree;
