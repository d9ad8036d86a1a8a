//! Stateless page tokens.
//!
//! A token is the hex encoding of `"{order}:{sequence}"`, where `sequence` is
//! the last entry already returned. The next page resumes strictly past it
//! in the same order. Sequences only grow, so entries appended between two
//! page requests never shift a descending cursor and are simply reached
//! last by an ascending one.

use campus_contracts::{
    audit::SortOrder,
    error::{CampusError, CampusResult},
};

fn order_tag(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Descending => "desc",
        SortOrder::Ascending => "asc",
    }
}

pub fn encode(order: SortOrder, last_sequence: u64) -> String {
    hex::encode(format!("{}:{}", order_tag(order), last_sequence))
}

/// Decode `token`, which must have been issued for `order`.
pub fn decode(token: &str, order: SortOrder) -> CampusResult<u64> {
    let invalid = || CampusError::validation(format!("invalid page token '{token}'"));

    let bytes = hex::decode(token).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (tag, sequence) = text.split_once(':').ok_or_else(invalid)?;

    if tag != order_tag(order) {
        return Err(CampusError::validation(format!(
            "page token was issued for '{tag}' order, not '{}'",
            order_tag(order)
        )));
    }

    sequence.parse::<u64>().map_err(|_| invalid())
}
