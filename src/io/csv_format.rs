//! CSV formats for UTXO snapshots, request scripts and replay results
//!
//! This module centralizes all CSV format concerns, providing:
//! - `UtxoRow` and `RequestRow` structures for deserialization
//! - Conversion from rows to domain types
//! - Replay result serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # UTXO snapshot
//!
//! Columns: `tx_hash,index,asset,amount,account,control_program,control_program_index`.
//! `control_program` is hex and may be empty; `control_program_index` defaults to 0.
//!
//! # Request script
//!
//! Columns: `id,op,account,asset,amount,tx_hash,index,token,ttl_secs,target,at`.
//! Which columns are required depends on `op`:
//!
//! | op             | required                   | optional                         |
//! |----------------|----------------------------|----------------------------------|
//! | `reserve`      | account, asset, amount     | tx_hash + index, token, ttl_secs |
//! | `reserve_utxo` | tx_hash, index             | account, token, ttl_secs         |
//! | `cancel`       | target                     | account                          |
//! | `expire`       |                            |                                  |
//!
//! `at` defaults to 0.

use crate::types::{
    AccountId, AssetId, Hash, Outpoint, ReplayResult, Request, RequestId, RequestRecord,
    ReserveError, Source, Utxo,
};
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// One row of a UTXO snapshot
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UtxoRow {
    pub tx_hash: String,
    pub index: u32,
    pub asset: String,
    pub amount: u64,
    pub account: String,
    pub control_program: Option<String>,
    pub control_program_index: Option<u64>,
}

/// One row of a request script
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RequestRow {
    pub id: RequestId,
    pub op: String,
    pub account: Option<String>,
    pub asset: Option<String>,
    pub amount: Option<u64>,
    pub tx_hash: Option<String>,
    pub index: Option<u32>,
    pub token: Option<String>,
    pub ttl_secs: Option<u64>,
    pub target: Option<RequestId>,
    pub at: Option<u64>,
}

fn parse_id<T: FromStr>(field: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    T::from_str(value).map_err(|e| format!("Invalid {} '{}': {}", field, value, e))
}

fn required<T>(value: Option<T>, field: &str, id: RequestId, op: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("Request {} ({}) requires '{}'", id, op, field))
}

/// Drop empty strings so blank cells read as absent
fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Convert a snapshot row to a `Utxo`
pub fn convert_utxo_row(row: UtxoRow) -> Result<Utxo, String> {
    let hash: Hash = parse_id("tx_hash", &row.tx_hash)?;
    let asset_id: AssetId = parse_id("asset", &row.asset)?;
    if row.account.is_empty() {
        return Err(format!("UTXO {}:{} has no account", hash, row.index));
    }

    let control_program = match present(row.control_program) {
        Some(program) => hex::decode(&program)
            .map_err(|e| format!("Invalid control_program '{}': {}", program, e))?,
        None => Vec::new(),
    };

    Ok(Utxo {
        outpoint: Outpoint::new(hash, row.index),
        asset_id,
        amount: row.amount,
        account_id: AccountId::new(row.account),
        control_program,
        control_program_index: row.control_program_index.unwrap_or(0),
    })
}

/// Convert a script row to a `RequestRecord`
///
/// Validates that the columns `op` needs are present. Surplus columns are
/// ignored.
pub fn convert_request_row(row: RequestRow) -> Result<RequestRecord, String> {
    let id = row.id;
    let op = row.op.to_lowercase();
    let account = present(row.account).map(AccountId::new);
    let token = present(row.token);
    let tx_hash = present(row.tx_hash)
        .map(|h| parse_id::<Hash>("tx_hash", &h))
        .transpose()?;

    let request = match op.as_str() {
        "reserve" => {
            let account_id = required(account.clone(), "account", id, &op)?;
            let asset = required(present(row.asset), "asset", id, &op)?;
            let amount = required(row.amount, "amount", id, &op)?;

            let mut source = Source::new(parse_id("asset", &asset)?, account_id, amount);
            match (tx_hash, row.index) {
                (Some(hash), Some(index)) => source = source.with_outpoint(hash, index),
                (None, _) => {}
                (Some(_), None) => {
                    return Err(format!("Request {} (reserve) has tx_hash without index", id))
                }
            }
            if let Some(token) = token {
                source = source.with_client_token(token);
            }

            Request::Reserve {
                source,
                ttl_secs: row.ttl_secs,
            }
        }
        "reserve_utxo" => Request::ReserveUtxo {
            tx_hash: required(tx_hash, "tx_hash", id, &op)?,
            index: required(row.index, "index", id, &op)?,
            client_token: token,
            ttl_secs: row.ttl_secs,
        },
        "cancel" => Request::Cancel {
            target: required(row.target, "target", id, &op)?,
        },
        "expire" => Request::Expire,
        _ => {
            return Err(format!(
                "Invalid operation: '{}' for request {}",
                row.op, id
            ))
        }
    };

    Ok(RequestRecord {
        id,
        account,
        at: row.at.unwrap_or(0),
        request,
    })
}

/// Write replay results to CSV format
///
/// Columns: id, op, outcome, reservation, account, held, change.
/// Results are sorted by request id for deterministic output; absent values
/// are written as empty cells.
pub fn write_results_csv(
    results: &[ReplayResult],
    output: &mut dyn Write,
) -> Result<(), ReserveError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["id", "op", "outcome", "reservation", "account", "held", "change"])?;

    let mut sorted: Vec<&ReplayResult> = results.iter().collect();
    sorted.sort_by_key(|result| result.id);

    fn cell<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    for result in sorted {
        writer.write_record(&[
            result.id.to_string(),
            result.op.to_string(),
            result.outcome.to_string(),
            cell(&result.reservation),
            cell(&result.account),
            cell(&result.held),
            cell(&result.change),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HASH: &str = "0101010101010101010101010101010101010101010101010101010101010101";
    const ASSET: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

    fn utxo_row() -> UtxoRow {
        UtxoRow {
            tx_hash: HASH.to_string(),
            index: 2,
            asset: ASSET.to_string(),
            amount: 50,
            account: "alice".to_string(),
            control_program: Some("0014ab".to_string()),
            control_program_index: None,
        }
    }

    fn request_row(op: &str) -> RequestRow {
        RequestRow {
            id: 7,
            op: op.to_string(),
            account: None,
            asset: None,
            amount: None,
            tx_hash: None,
            index: None,
            token: None,
            ttl_secs: None,
            target: None,
            at: None,
        }
    }

    #[test]
    fn test_convert_utxo_row() {
        let utxo = convert_utxo_row(utxo_row()).unwrap();

        assert_eq!(utxo.outpoint.to_string(), format!("{}:2", HASH));
        assert_eq!(utxo.asset_id.to_string(), ASSET);
        assert_eq!(utxo.amount, 50);
        assert_eq!(utxo.account_id, AccountId::new("alice"));
        assert_eq!(utxo.control_program, vec![0x00, 0x14, 0xab]);
        assert_eq!(utxo.control_program_index, 0);
    }

    #[rstest]
    #[case::short_hash(UtxoRow { tx_hash: "abcd".to_string(), ..utxo_row() }, "Invalid tx_hash")]
    #[case::bad_asset(UtxoRow { asset: "zz".repeat(32), ..utxo_row() }, "Invalid asset")]
    #[case::bad_program(UtxoRow { control_program: Some("xyz".to_string()), ..utxo_row() }, "Invalid control_program")]
    #[case::no_account(UtxoRow { account: String::new(), ..utxo_row() }, "has no account")]
    fn test_convert_utxo_row_errors(#[case] row: UtxoRow, #[case] expected_error: &str) {
        let err = convert_utxo_row(row).unwrap_err();
        assert!(err.contains(expected_error), "unexpected error: {}", err);
    }

    #[test]
    fn test_convert_reserve_row() {
        let row = RequestRow {
            account: Some("alice".to_string()),
            asset: Some(ASSET.to_string()),
            amount: Some(25),
            token: Some("tok".to_string()),
            ttl_secs: Some(60),
            at: Some(3),
            ..request_row("Reserve")
        };

        let record = convert_request_row(row).unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.at, 3);
        assert_eq!(record.account, Some(AccountId::new("alice")));
        match record.request {
            Request::Reserve { source, ttl_secs } => {
                assert_eq!(source.amount, 25);
                assert_eq!(source.client_token.as_deref(), Some("tok"));
                assert_eq!(source.forced_outpoint(), None);
                assert_eq!(ttl_secs, Some(60));
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_convert_reserve_row_with_forced_outpoint() {
        let row = RequestRow {
            account: Some("alice".to_string()),
            asset: Some(ASSET.to_string()),
            amount: Some(25),
            tx_hash: Some(HASH.to_string()),
            index: Some(1),
            ..request_row("reserve")
        };

        let record = convert_request_row(row).unwrap();
        let Request::Reserve { source, .. } = record.request else {
            panic!("expected reserve");
        };
        assert_eq!(
            source.forced_outpoint(),
            Some((HASH.parse().unwrap(), 1))
        );
    }

    #[rstest]
    #[case::reserve_utxo(
        RequestRow { tx_hash: Some(HASH.to_string()), index: Some(0), ..request_row("reserve_utxo") },
        "reserve_utxo"
    )]
    #[case::cancel(RequestRow { target: Some(1), ..request_row("cancel") }, "cancel")]
    #[case::expire(RequestRow { at: Some(10), ..request_row("EXPIRE") }, "expire")]
    fn test_convert_other_rows(#[case] row: RequestRow, #[case] expected_op: &str) {
        let record = convert_request_row(row).unwrap();
        assert_eq!(record.request.op(), expected_op);
    }

    #[rstest]
    #[case::unknown_op(request_row("spend"), "Invalid operation")]
    #[case::reserve_without_account(
        RequestRow { asset: Some(ASSET.to_string()), amount: Some(1), ..request_row("reserve") },
        "requires 'account'"
    )]
    #[case::reserve_without_amount(
        RequestRow { account: Some("a".to_string()), asset: Some(ASSET.to_string()), ..request_row("reserve") },
        "requires 'amount'"
    )]
    #[case::blank_asset(
        RequestRow { account: Some("a".to_string()), asset: Some(" ".to_string()), amount: Some(1), ..request_row("reserve") },
        "requires 'asset'"
    )]
    #[case::hash_without_index(
        RequestRow {
            account: Some("a".to_string()),
            asset: Some(ASSET.to_string()),
            amount: Some(1),
            tx_hash: Some(HASH.to_string()),
            ..request_row("reserve")
        },
        "without index"
    )]
    #[case::reserve_utxo_without_index(
        RequestRow { tx_hash: Some(HASH.to_string()), ..request_row("reserve_utxo") },
        "requires 'index'"
    )]
    #[case::cancel_without_target(request_row("cancel"), "requires 'target'")]
    #[case::bad_hash(
        RequestRow { tx_hash: Some("nothex".to_string()), index: Some(0), ..request_row("reserve_utxo") },
        "Invalid tx_hash"
    )]
    fn test_convert_request_row_errors(#[case] row: RequestRow, #[case] expected_error: &str) {
        let err = convert_request_row(row).unwrap_err();
        assert!(err.contains(expected_error), "unexpected error: {}", err);
    }

    #[test]
    fn test_write_results_csv_sorted_with_empty_cells() {
        let results = vec![
            ReplayResult {
                id: 2,
                op: "cancel",
                outcome: "not_found",
                reservation: None,
                account: None,
                held: None,
                change: None,
            },
            ReplayResult {
                id: 1,
                op: "reserve",
                outcome: "ok",
                reservation: Some(1),
                account: Some(AccountId::new("alice")),
                held: Some(30),
                change: Some(5),
            },
        ];
        let mut output = Vec::new();

        write_results_csv(&results, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,op,outcome,reservation,account,held,change\n\
             1,reserve,ok,1,alice,30,5\n\
             2,cancel,not_found,,,,\n"
        );
    }
}
