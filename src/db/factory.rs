//! Factory for creating repository instances.

use std::str::FromStr;
use std::sync::Arc;

use super::repositories::LocalRepository;
use super::repository::FullRepository;

/// Available repository backends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RepositoryType {
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "memory" => Ok(RepositoryType::Local),
            other => Err(format!("unknown repository type '{}'", other)),
        }
    }
}

/// Creates repository instances for the configured backend.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create an in-memory repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a repository of the given type.
    pub fn create(repo_type: RepositoryType) -> Arc<dyn FullRepository> {
        match repo_type {
            RepositoryType::Local => Self::create_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_type_parsing() {
        assert_eq!(RepositoryType::from_str("local").unwrap(), RepositoryType::Local);
        assert_eq!(RepositoryType::from_str("MEMORY").unwrap(), RepositoryType::Local);
        assert!(RepositoryType::from_str("postgres").is_err());
    }

    #[tokio::test]
    async fn test_create_local() {
        let repo = RepositoryFactory::create(RepositoryType::Local);
        assert!(repo.health_check().await.unwrap());
    }
}
