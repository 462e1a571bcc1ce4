use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Conflict,
    Shift,
    Employee,
    Constraint,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Conflict => "conflict",
            EntityKind::Shift => "shift",
            EntityKind::Employee => "employee",
            EntityKind::Constraint => "constraint",
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(EntityKind, Ulid),
    Validation(String),
    BusinessRule(String),
    Persistence(String),
    LimitExceeded(&'static str),
}

impl EngineError {
    /// Stable error kind tag used in result details and per-item batch records.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound(..) => "not_found",
            EngineError::Validation(_) => "validation",
            EngineError::BusinessRule(_) => "business_rule",
            EngineError::Persistence(_) => "persistence",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(kind, id) => write!(f, "{} not found: {id}", kind.as_str()),
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::BusinessRule(msg) => write!(f, "business rule violated: {msg}"),
            EngineError::Persistence(msg) => write!(f, "persistence error: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
