//! Fixed-shape searches over the lexicon, the gazetteer and the bibliography.
//!
//! Unlike the configurable engine in [`crate::search`] these know their
//! tables by name and return typed rows.

use rusqlite::params;

use crate::error::Result;
use crate::record::{Record, query_records};
use crate::store::Store;

/// A lexicon term together with one of its definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordHit {
    pub uid: i64,
    pub term: Option<String>,
    pub translation: Option<String>,
    pub emic_term: Option<String>,
    pub colonial_term: Option<String>,
    pub transliteration: Option<String>,
    pub definition: Option<String>,
    /// Terms listed as children of this one.
    pub related_terms: Vec<String>,
}

/// Terms matching `pattern` in any of their name columns, one row per
/// definition. Terms without a definition are not returned.
pub fn word_search(store: &Store, pattern: &str) -> Result<Vec<WordHit>> {
    store.case().compile(pattern)?;
    store.with_connection(|conn| {
        let records = query_records(
            conn,
            "
            select l.UID, l.Term, l.Translation, l.Emic_Term, l.Colonial_Term,
                    l.Transliteration, d.Definition
                from lexicon l
                join definitions d
                on l.UID = d.Lexicon_ID
                where l.Term regexp ?1
                or l.Translation regexp ?1
                or l.Emic_Term regexp ?1
                or l.Colonial_Term regexp ?1
                or l.Transliteration regexp ?1
                order by l.UID, d.UID
        ",
            params![pattern],
        )?;
        let mut children = conn.prepare(
            "
            select l.Term
                from related_terms rt
                join lexicon l
                on rt.Child_ID = l.UID
                where rt.Parent_ID = ?1
                order by l.Term
        ",
        )?;
        let mut hits = Vec::with_capacity(records.len());
        for record in records {
            let Some(uid) = record.integer("UID") else {
                continue;
            };
            let related = children.query_map(params![uid], |row| row.get::<_, Option<String>>(0))?;
            let mut related_terms = Vec::new();
            for term in related {
                related_terms.extend(term?);
            }
            hits.push(WordHit {
                uid,
                term: record.text("Term"),
                translation: record.text("Translation"),
                emic_term: record.text("Emic_Term"),
                colonial_term: record.text("Colonial_Term"),
                transliteration: record.text("Transliteration"),
                definition: record.text("Definition"),
                related_terms,
            });
        }
        Ok(hits)
    })
}

/// Attributes of every gazetteer location whose nickname or any of its
/// names matches, each row carrying the location's names as well.
pub fn location_search(store: &Store, pattern: &str) -> Result<Vec<Record>> {
    store.case().compile(pattern)?;
    store.with_connection(|conn| {
        query_records(
            conn,
            "
            select la.*, g.Nickname, g.Location_Name_Arabic,
                    g.Location_Name_Colonial, g.Location_Name_Latin
                from location_attributes la
                join gazetteer g
                on la.Location_ID = g.UID
                where g.Nickname regexp ?1
                or g.Location_Name_Arabic regexp ?1
                or g.Location_Name_Colonial regexp ?1
                or g.Location_Name_Latin regexp ?1
                order by g.UID, la.UID
        ",
            params![pattern],
        )
    })
}

/// Narrows a bibliography search to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryFilter {
    /// Exact `Repository_ID`.
    Id(i64),
    /// Pattern matched against the acronym and both repository names.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHit {
    pub uid: i64,
    pub acronym: Option<String>,
    pub catalog_no: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub date_pub_greg: Option<String>,
    pub date_pub_hij: Option<String>,
}

impl SourceHit {
    fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            uid: record.integer("UID")?,
            acronym: record.text("Acronym"),
            catalog_no: record.text("Catalog_No"),
            author: record.text("Author"),
            title: record.text("Title"),
            date_pub_greg: record.text("Date_Pub_Greg"),
            date_pub_hij: record.text("Date_Pub_Hij"),
        })
    }
}

const SOURCE_COLUMNS: &str =
    "b.UID, r.Acronym, b.Catalog_No, b.Author, b.Title, b.Date_Pub_Greg, b.Date_Pub_Hij";

/// Bibliography entries whose author or title matches `pattern`.
pub fn bibliography_search(
    store: &Store,
    pattern: &str,
    filter: Option<&RepositoryFilter>,
) -> Result<Vec<SourceHit>> {
    store.case().compile(pattern)?;
    if let Some(RepositoryFilter::Name(name)) = filter {
        store.case().compile(name)?;
    }
    store.with_connection(|conn| {
        let records = match filter {
            None => query_records(
                conn,
                &format!(
                    "select {SOURCE_COLUMNS}
                        from bibliography b
                        left join repositories r
                        on b.Repository_ID = r.UID
                        where b.Author regexp ?1 or b.Title regexp ?1
                        order by b.UID"
                ),
                params![pattern],
            )?,
            Some(RepositoryFilter::Id(repository)) => query_records(
                conn,
                &format!(
                    "select {SOURCE_COLUMNS}
                        from bibliography b
                        left join repositories r
                        on b.Repository_ID = r.UID
                        where (b.Author regexp ?1 or b.Title regexp ?1)
                        and b.Repository_ID = ?2
                        order by b.UID"
                ),
                params![pattern, repository],
            )?,
            Some(RepositoryFilter::Name(name)) => query_records(
                conn,
                &format!(
                    "select {SOURCE_COLUMNS}
                        from bibliography b
                        join repositories r
                        on b.Repository_ID = r.UID
                        where (b.Author regexp ?1 or b.Title regexp ?1)
                        and (r.Acronym regexp ?2 or r.Name_Foreign regexp ?2 or r.Name_English regexp ?2)
                        order by b.UID"
                ),
                params![pattern, name],
            )?,
        };
        Ok(records.iter().filter_map(SourceHit::from_record).collect())
    })
}
