/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Chain ID formats.
//!
//! Admins may launch chainlets with any chain ID in the general format: 1 to [`MAX_CHAIN_ID_LEN`] ASCII
//! letters, digits, `_`, `-` or `.`, starting with a letter.
//!
//! Everybody else is restricted to the self-service format `<name>_<number>-<revision>`, where `name` is
//! 1 to [`MAX_SELF_SERVICE_NAME_LEN`] lowercase letters or digits starting with a letter, and `number`
//! and `revision` are positive decimal integers without leading zeros. For example, `mychain_2713-1`.

pub const MAX_CHAIN_ID_LEN: usize = 48;

pub const MAX_SELF_SERVICE_NAME_LEN: usize = 32;

/// Whether `chain_id` is in the general chain ID format.
pub fn is_valid_chain_id(chain_id: &str) -> bool {
    let mut chars = chain_id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => (),
        _ => return false,
    }

    chain_id.len() <= MAX_CHAIN_ID_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Whether `chain_id` is in the stricter self-service chain ID format.
pub fn is_self_service_chain_id(chain_id: &str) -> bool {
    if !is_valid_chain_id(chain_id) {
        return false;
    }

    let Some((name, numbers)) = chain_id.split_once('_') else {
        return false;
    };
    let Some((number, revision)) = numbers.split_once('-') else {
        return false;
    };

    let name_ok = !name.is_empty()
        && name.len() <= MAX_SELF_SERVICE_NAME_LEN
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    name_ok && is_positive_integer(number) && is_positive_integer(revision)
}

fn is_positive_integer(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('0')
        && s.chars().all(|c| c.is_ascii_digit())
        && s.parse::<u64>().is_ok()
}
