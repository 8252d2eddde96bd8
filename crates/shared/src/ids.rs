/// Prefix shared by every generated id.
pub const ID_PREFIX: &str = "dtrm-";

pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Monotonic `dtrm-1`, `dtrm-2`, ... ids.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    issued: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        self.issued += 1;
        format!("{ID_PREFIX}{}", self.issued)
    }
}

/// Random v4 ids, for pages that mix several story maps.
#[cfg(feature = "uuid-support")]
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

#[cfg(feature = "uuid-support")]
impl IdSource for UuidIds {
    fn next_id(&mut self) -> String {
        format!("{ID_PREFIX}{}", uuid::Uuid::new_v4())
    }
}
