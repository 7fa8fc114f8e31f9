//! Record resolution.
//!
//! Each cycle re-determines the single DNS record to evaluate, either
//! directly by a configured record id or by searching on
//! (domain, subdomain, type). Nothing is cached between cycles: external
//! changes to the record must be observed.

use crate::config::Config;
use crate::dnspod::{CommonParams, DnspodApi, RecordData, RecordListParams};
use crate::error::{DdnsError, Result};

/// Page size for `Record.List` lookups.
const LIST_PAGE_SIZE: u32 = 100;

/// The record chosen for this cycle, carrying everything an update must
/// preserve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub record_type: String,
    pub line: String,
    pub line_id: String,
}

/// How the operator identifies the target record.
#[derive(Debug, Clone)]
pub struct RecordSelection {
    /// When set, the record is fetched directly and no search happens.
    pub record_id: Option<i64>,
    pub sub_domain: String,
    pub record_type: String,
}

impl RecordSelection {
    pub fn from_config(config: &Config) -> Self {
        Self {
            record_id: config.record_id,
            sub_domain: config.sub_domain.clone(),
            record_type: config.record_type.clone(),
        }
    }
}

/// Determine the single record this cycle will evaluate.
pub async fn resolve(
    api: &dyn DnspodApi,
    common: &CommonParams,
    selection: &RecordSelection,
) -> Result<ResolvedRecord> {
    if let Some(id) = selection.record_id {
        let info = api.record_info(common, id).await?;
        return Ok(from_record_data(id, &info.record));
    }

    let list = api
        .record_list(
            common,
            &RecordListParams {
                sub_domain: selection.sub_domain.clone(),
                record_type: selection.record_type.clone(),
                offset: 0,
                length: LIST_PAGE_SIZE,
            },
        )
        .await?;

    if list.records.is_empty() {
        return Err(DdnsError::RecordResolution(format!(
            "no records found for sub_domain {:?}",
            selection.sub_domain
        )));
    }

    let record = &list.records[pick_record(&list.records, &selection.record_type)];
    let id: i64 = record
        .id
        .trim()
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            DdnsError::RecordResolution(format!(
                "invalid record id in list response: {:?}",
                record.id
            ))
        })?;

    Ok(from_record_data(id, record))
}

fn from_record_data(id: i64, record: &RecordData) -> ResolvedRecord {
    ResolvedRecord {
        id,
        name: record.name.trim().to_string(),
        value: record.value.trim().to_string(),
        record_type: record.record_type.trim().to_string(),
        line: record.line.trim().to_string(),
        line_id: record.line_id.trim().to_string(),
    }
}

/// Tie-break when several records match the search: prefer the first record
/// whose type equals the desired type (case-insensitive), otherwise keep
/// provider order and take the first.
fn pick_record(records: &[RecordData], want_type: &str) -> usize {
    let want = want_type.trim();
    if !want.is_empty() {
        if let Some(i) = records
            .iter()
            .position(|r| r.record_type.trim().eq_ignore_ascii_case(want))
        {
            return i;
        }
    }
    0
}
