/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are used across multiple components of the chainlet module.
//!
//! Types specific to a single component can be found in that component's module, e.g., the packet
//! payloads in [`crate::upgrade::messages`].

pub mod chain_id;

pub mod chainlet;

pub mod data_types;

pub mod stack;

pub mod update_sets;
