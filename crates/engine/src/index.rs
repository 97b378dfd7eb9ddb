use std::collections::BTreeMap;

use log::debug;

use crate::model::{Abbreviation, NormalizedDescription, Record, SiteIndex};
use crate::normalize;

/// Build one description index per site.
///
/// Records sharing a site and the same trimmed description collapse into a
/// single [`NormalizedDescription`] whose members are the union of their
/// item ids, so each distinct text is scored once per query.
pub fn build_indexes(
    records: &[Record],
    abbreviations: &[Abbreviation],
) -> BTreeMap<String, SiteIndex> {
    let mut indexes: BTreeMap<String, SiteIndex> = BTreeMap::new();
    for record in records {
        let index = indexes.entry(record.site.clone()).or_default();
        let text = record.description.trim().to_string();
        index
            .by_text
            .entry(text.clone())
            .or_insert_with(|| NormalizedDescription {
                text: text.clone(),
                tokens: normalize::tokenize(&record.description, abbreviations),
                members: Default::default(),
            })
            .members
            .insert(record.item_id.clone());
        if let Some(code) = &record.code {
            if !code.trim().is_empty() {
                index
                    .by_code
                    .entry(code.trim().to_string())
                    .or_default()
                    .insert(record.item_id.clone());
            }
        }
        index.text_of.insert(record.item_id.clone(), text);
    }
    debug!(
        "built {} site indexes from {} records",
        indexes.len(),
        records.len()
    );
    indexes
}

/// Union two index maps. On text collision within a site the member sets
/// merge; tokens come from whichever side indexed the text first.
pub fn merge_indexes(
    mut base: BTreeMap<String, SiteIndex>,
    other: BTreeMap<String, SiteIndex>,
) -> BTreeMap<String, SiteIndex> {
    for (site, incoming) in other {
        let index = base.entry(site).or_default();
        for (text, desc) in incoming.by_text {
            index
                .by_text
                .entry(text)
                .and_modify(|existing| existing.members.extend(desc.members.iter().cloned()))
                .or_insert(desc);
        }
        for (code, members) in incoming.by_code {
            index.by_code.entry(code).or_default().extend(members);
        }
        for (item_id, text) in incoming.text_of {
            index.text_of.entry(item_id).or_insert(text);
        }
    }
    base
}
