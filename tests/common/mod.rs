#![allow(dead_code)]

use rusqlite::Connection;
use tempfile::TempDir;

use eurasia::store::{CaseMode, Store};

pub const SCHEMA: &str = "
    create table repositories (
        UID integer primary key,
        Acronym text not null,
        Name_Foreign text,
        Name_English text,
        Notes text
    );
    create table bibliography (
        UID integer primary key,
        Repository_ID integer references repositories(UID),
        Catalog_No text,
        Author text,
        Title text,
        Date_Pub_Greg text,
        Date_Pub_Hij text,
        Notes text
    );
    create table lexicon (
        UID integer primary key,
        Term text not null,
        Translation text,
        Emic_Term text,
        Colonial_Term text,
        Transliteration text,
        Notes text,
        Created_At text
    );
    create table definitions (
        UID integer primary key,
        Lexicon_ID integer not null references lexicon(UID) on delete cascade,
        Definition text not null,
        Definition_Type text,
        Source_ID integer references bibliography(UID),
        Source_Note text,
        Specificity text,
        Notes text
    );
    create table related_terms (
        UID integer primary key,
        Parent_ID integer not null references lexicon(UID),
        Child_ID integer not null references lexicon(UID)
    );
    create table gazetteer (
        UID integer primary key,
        Nickname text,
        Location_Name_Arabic text,
        Location_Name_Colonial text,
        Location_Name_Latin text,
        Notes text
    );
    create table location_attributes (
        UID integer primary key,
        Location_ID integer not null references gazetteer(UID),
        Attribute_Type text,
        Attribute_Value text,
        Date_Range text
    );
    create table people (
        UID integer primary key,
        Name text not null,
        Name_Arabic text,
        Nisba text,
        Birth_Date text,
        Death_Date text,
        Birthplace_ID integer references gazetteer(UID),
        Notes text
    );
    create table roles (
        UID integer primary key,
        Role text not null,
        Description text
    );
    create table people_roles (
        UID integer primary key,
        Person_ID integer not null references people(UID),
        Role_ID integer not null references roles(UID),
        Date_Range text
    );
";

pub const SEED: &str = "
    insert into repositories values
        (1, 'BOA', 'Başbakanlık Osmanlı Arşivi', 'Ottoman Archives', null),
        (2, 'BL', null, 'British Library', null);
    insert into bibliography values
        (1, 1, 'A.DVN 12', 'Evliya Çelebi', 'Seyahatname', '1680', '1091', null),
        (2, 2, 'Add. 7845', 'Ibn Khaldun', 'Muqaddimah', '1377', '779', 'copied in Cairo'),
        (3, null, null, 'Anonymous', 'Qur’an commentary', null, null, null);
    insert into lexicon values
        (1, 'qadi', 'judge', 'قاضي', 'cadi', 'qāḍī', null, null),
        (2, 'waqf', 'endowment', 'وقف', 'vakıf', 'waqf', 'pious foundation deeds', null),
        (3, 'mahkama', 'court', 'محكمة', null, 'maḥkama', null, null),
        (4, 'sijill', 'court register', 'سجل', null, 'sijill', 'kept by the qadi', null);
    insert into definitions values
        (1, 1, 'Judge applying sharia law', 'legal', 1, null, 'Ottoman, regional', null),
        (2, 2, 'Inalienable charitable endowment', 'legal', null, 'oral history', 'general', null),
        (3, 3, 'Sharia court', 'institutional', 2, null, 'Ottoman; legal', null);
    insert into related_terms values
        (1, 3, 1),
        (2, 3, 4);
    insert into gazetteer values
        (1, 'Bukhara', 'بخارى', 'Boukhara', 'Bukhara', null),
        (2, 'Samarkand', 'سمرقند', 'Samarcande', 'Samarqand', 'capital of Timur');
    insert into location_attributes values
        (1, 1, 'population', '100000', '1800-1850'),
        (2, 1, 'ruler', 'Emir', '1785-1920'),
        (3, 2, 'population', '30000', '1850');
    insert into people values
        (1, 'Ibn Battuta', 'ابن بطوطة', 'al-Tanji', '1304', '1369', null, 'traveller'),
        (2, 'Timur', 'تيمور', null, '1336', '1405', 2, null);
    insert into roles values
        (1, 'Traveller', 'one who journeys'),
        (2, 'Emir', null);
    insert into people_roles values
        (1, 1, 1, '1325-1354'),
        (2, 2, 2, '1370-1405');
";

/// A junction table keyed by both of its foreign keys.
pub const TERM_LINKS: &str = "
    create table term_links (
        Parent_ID integer not null references lexicon(UID),
        Child_ID integer not null references lexicon(UID),
        Note text,
        primary key (Parent_ID, Child_ID)
    );
";

/// A seeded research database in a temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub store: Store,
}

impl Fixture {
    pub fn seeded() -> Self {
        Self::with_sql(&[SCHEMA, SEED])
    }

    pub fn empty() -> Self {
        Self::with_sql(&[SCHEMA])
    }

    pub fn with_sql(scripts: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("eurasia_test.db");
        let conn = Connection::open(&path).expect("create db");
        for script in scripts {
            conn.execute_batch(script).expect("schema");
        }
        drop(conn);
        let store = Store::open(&path, CaseMode::Sensitive).expect("store");
        Self { dir, store }
    }

    pub fn conn(&self) -> Connection {
        self.store.connect().expect("connection")
    }

    pub fn count(&self, table: &str) -> i64 {
        self.conn()
            .query_row(&format!("select count(*) from {table}"), [], |row| row.get(0))
            .expect("count")
    }
}
