/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// An identifier that clients send either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LooseId {
    Num(i64),
    Str(String),
}

impl LooseId {
    /// Interpret as a database id, parsing numeric strings.
    pub fn as_db_id(&self) -> Option<DbId> {
        match self {
            LooseId::Num(n) => Some(*n),
            LooseId::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Canonical string form, used as an external reference key.
    pub fn to_key(&self) -> String {
        match self {
            LooseId::Num(n) => n.to_string(),
            LooseId::Str(s) => s.clone(),
        }
    }
}

impl From<DbId> for LooseId {
    fn from(id: DbId) -> Self {
        LooseId::Num(id)
    }
}
