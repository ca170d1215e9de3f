use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("unknown entity type '{0}'")]
    UnknownEntity(String),

    #[error("entity '{0}' declares no labels and no members")]
    EntityWithoutLabels(String),

    #[error("entity '{0}' names unknown member '{1}'")]
    UnknownMember(String, String),
}
