//! Schema and statement text. Every statement is parameterized; caller
//! strings (sign text, bookmark labels, metadata) are only ever bound.

/// Value stamped into `PRAGMA user_version` on a fresh file.
pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE: &str = "
    create table if not exists block (
        p int not null,
        q int not null,
        x int not null,
        y int not null,
        z int not null,
        w int not null
    );
    create table if not exists light (
        p int not null,
        q int not null,
        x int not null,
        y int not null,
        z int not null,
        w int not null
    );
    create table if not exists generation_key (
        p int not null,
        q int not null,
        version int not null
    );
    create table if not exists sign (
        p int not null,
        q int not null,
        x int not null,
        y int not null,
        z int not null,
        face int not null,
        text text not null
    );
    create table if not exists metadata (
        key text not null primary key,
        value text not null
    );
    create table if not exists bookmark (
        label text not null,
        major int not null,
        minor int not null,
        x int not null,
        y int not null,
        z int not null
    );
    create table if not exists player_state (
        x real not null,
        y real not null,
        z real not null,
        rx real not null,
        ry real not null
    );
    create table if not exists tagged_block (
        x int not null,
        y int not null,
        z int not null,
        tag text not null
    );
    create unique index if not exists block_pqxyz_idx on block (p, q, x, y, z);
    create unique index if not exists light_pqxyz_idx on light (p, q, x, y, z);
    create unique index if not exists generation_key_pq_idx on generation_key (p, q);
    create unique index if not exists sign_xyzface_idx on sign (x, y, z, face);
    create index if not exists sign_pq_idx on sign (p, q);
    create unique index if not exists bookmark_idx on bookmark (label, major, minor);
    create index if not exists tagged_block_tag_idx on tagged_block (tag);
";

pub const UPSERT_BLOCK: &str = "
    insert into block (p, q, x, y, z, w) values (?1, ?2, ?3, ?4, ?5, ?6)
    on conflict (p, q, x, y, z) do update set w = excluded.w";
pub const UPSERT_LIGHT: &str = "
    insert into light (p, q, x, y, z, w) values (?1, ?2, ?3, ?4, ?5, ?6)
    on conflict (p, q, x, y, z) do update set w = excluded.w";
pub const UPSERT_KEY: &str = "
    insert into generation_key (p, q, version) values (?1, ?2, ?3)
    on conflict (p, q) do update set version = excluded.version";

pub const LOAD_BLOCKS: &str = "select x, y, z, w from block where p = ?1 and q = ?2";
pub const LOAD_LIGHTS: &str = "select x, y, z, w from light where p = ?1 and q = ?2";
pub const LOAD_SIGNS: &str = "select x, y, z, face, text from sign where p = ?1 and q = ?2";
pub const GET_KEY: &str = "select version from generation_key where p = ?1 and q = ?2";

pub const UPSERT_SIGN: &str = "
    insert into sign (p, q, x, y, z, face, text) values (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    on conflict (x, y, z, face) do update set p = excluded.p, q = excluded.q, text = excluded.text";
pub const DELETE_SIGN: &str = "delete from sign where x = ?1 and y = ?2 and z = ?3 and face = ?4";
pub const DELETE_SIGNS_AT: &str = "delete from sign where x = ?1 and y = ?2 and z = ?3";
pub const DELETE_ALL_SIGNS: &str = "delete from sign";

pub const GET_METADATA: &str = "select value from metadata where key = ?1";
pub const UPSERT_METADATA: &str = "
    insert into metadata (key, value) values (?1, ?2)
    on conflict (key) do update set value = excluded.value";

pub const UPSERT_BOOKMARK: &str = "
    insert into bookmark (label, major, minor, x, y, z) values (?1, ?2, ?3, ?4, ?5, ?6)
    on conflict (label, major, minor) do update set x = excluded.x, y = excluded.y, z = excluded.z";
pub const GET_BOOKMARK: &str =
    "select x, y, z from bookmark where label = ?1 and major = ?2 and minor = ?3";

pub const CLEAR_PLAYER_STATE: &str = "delete from player_state";
pub const INSERT_PLAYER_STATE: &str =
    "insert into player_state (x, y, z, rx, ry) values (?1, ?2, ?3, ?4, ?5)";
pub const LOAD_PLAYER_STATE: &str = "select x, y, z, rx, ry from player_state limit 1";

pub const INSERT_TAGGED_BLOCK: &str = "insert into tagged_block (x, y, z, tag) values (?1, ?2, ?3, ?4)";
pub const LOAD_TAGGED_BLOCKS: &str = "select x, y, z from tagged_block";
pub const DELETE_TAGGED_BLOCKS: &str = "delete from tagged_block where tag = ?1";
pub const DELETE_ALL_TAGGED_BLOCKS: &str = "delete from tagged_block";

/// Tables reported by `table_counts`, in `TableCounts` field order.
pub const COUNTED_TABLES: [&str; 7] = [
    "block",
    "light",
    "generation_key",
    "sign",
    "metadata",
    "bookmark",
    "tagged_block",
];
