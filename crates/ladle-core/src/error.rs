use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Glob expansion or filesystem traversal failed.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid story pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A matched story file could not be statically analyzed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct ParseError {
    /// The offending file, as matched.
    pub path: String,
    /// Human-readable reason.
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// One export that took part in a key collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollidingStory {
    pub file_path: String,
    pub export_name: String,
}

/// All stories that share one normalized key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    pub stories: Vec<CollidingStory>,
}

impl KeyCollision {
    /// Distinct source files involved, in discovery order.
    #[must_use]
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for story in &self.stories {
            if !files.contains(&story.file_path.as_str()) {
                files.push(&story.file_path);
            }
        }
        files
    }
}

/// Two or more stories resolve to the same normalized key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct DuplicateError {
    pub collisions: Vec<KeyCollision>,
}

impl fmt::Display for DuplicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicate story names found. Each story must resolve to a unique id:"
        )?;
        for collision in &self.collisions {
            let sources: Vec<String> = collision
                .stories
                .iter()
                .map(|s| format!("{} ({})", s.file_path, s.export_name))
                .collect();
            write!(f, "\n  - \"{}\" in {}", collision.key, sources.join(", "))?;
        }
        Ok(())
    }
}

/// Any failure of the discovery pipeline.
///
/// This is what the plugin adapter catches; messages pass through verbatim.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error("Failed to serialize config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Loading `<config folder>/config.*` failed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid config at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_error_lists_every_source() {
        let err = DuplicateError {
            collisions: vec![KeyCollision {
                key: "primary".to_string(),
                stories: vec![
                    CollidingStory {
                        file_path: "src/A.stories.ts".to_string(),
                        export_name: "Primary".to_string(),
                    },
                    CollidingStory {
                        file_path: "src/B.stories.ts".to_string(),
                        export_name: "Primary".to_string(),
                    },
                ],
            }],
        };

        let message = err.to_string();
        assert!(message.contains("\"primary\""));
        assert!(message.contains("src/A.stories.ts (Primary)"));
        assert!(message.contains("src/B.stories.ts (Primary)"));
        assert_eq!(
            err.collisions[0].files(),
            vec!["src/A.stories.ts", "src/B.stories.ts"]
        );
    }

    #[test]
    fn test_generation_error_is_transparent() {
        let err: GenerationError = ParseError::new("src/x.stories.tsx", "Unexpected token").into();
        assert_eq!(err.to_string(), "src/x.stories.tsx: Unexpected token");
    }
}
