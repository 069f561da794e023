/// Error enumeration shared by every repository trait in the crate.
///
/// The persistent store is assumed to provide atomic single-row updates and
/// to signal uniqueness violations distinctly from other failures; the
/// variants mirror that contract.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
