//! Catalog table definitions
//!
//! Column names and their textual encodings (upper-hex hashes, `"True"` /
//! `"False"` flags, `b`/`u`/`p` origins) stay compatible with databases
//! written by earlier tools.

/// Entity tables in drop order, children before parents
pub const ENTITY_TABLES: [&str; 7] = [
    "ebxlut",
    "chunks",
    "res",
    "bundles",
    "globalchunks",
    "tocfiles",
    "sbfiles",
];

/// Key/value settings
pub const SETTINGS: &str = "CREATE TABLE IF NOT EXISTS settings (key TEXT, value TEXT)";

/// Entity tables, parents before children
pub const ENTITIES: &str = r"
CREATE TABLE IF NOT EXISTS sbfiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    type TEXT
);

CREATE TABLE IF NOT EXISTS tocfiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    md5 TEXT,
    incas TEXT,
    type TEXT
);

CREATE TABLE IF NOT EXISTS globalchunks (
    idx INTEGER PRIMARY KEY AUTOINCREMENT,
    tocfile INTEGER,
    id TEXT,
    sha1 TEXT,
    offset INT,
    size INT,
    FOREIGN KEY (tocfile) REFERENCES tocfiles (id)
);

CREATE TABLE IF NOT EXISTS bundles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tocfile INTEGER,
    frostid TEXT,
    offset INT,
    size INT,
    base TEXT,
    delta TEXT,
    FOREIGN KEY (tocfile) REFERENCES tocfiles (id)
);

CREATE TABLE IF NOT EXISTS res (
    name TEXT,
    sha1 TEXT,
    rtype TEXT,
    bundle INT,
    FOREIGN KEY (bundle) REFERENCES bundles (id)
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT,
    sha1 TEXT,
    bundle INT,
    FOREIGN KEY (bundle) REFERENCES bundles (id)
);

CREATE TABLE IF NOT EXISTS ebxlut (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    sha1 TEXT,
    basesha1 TEXT,
    deltasha1 TEXT,
    casptype INT,
    guid TEXT,
    bundlepath TEXT,
    offset INT,
    size INT,
    isbase TEXT,
    isdelta TEXT,
    tocpath TEXT,
    incas TEXT,
    filetype TEXT
);
";

/// `DROP TABLE` statements for every entity table
pub fn drop_entities() -> String {
    ENTITY_TABLES
        .iter()
        .map(|table| format!("DROP TABLE IF EXISTS {table};\n"))
        .collect()
}
