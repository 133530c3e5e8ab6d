//! Author lookup for new tasks
//!
//! Sources are tried in order; the first that produces a non-blank name wins.
//! Lookup never fails task creation: with no source available the author is
//! [`UNKNOWN_AUTHOR`].

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

/// Placeholder used when no source yields an author
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Something that may know who is creating a task
pub trait AuthorSource {
    fn author(&self) -> Option<String>;
}

/// Always returns the configured string
#[derive(Debug, Clone)]
pub struct FixedAuthor(pub String);

impl AuthorSource for FixedAuthor {
    fn author(&self) -> Option<String> {
        non_blank(&self.0)
    }
}

/// `git config user.name` and `user.email`, as `Name <email>`
#[derive(Debug, Clone, Default)]
pub struct GitAuthor {
    /// Directory to run git in; the process cwd when unset
    pub dir: Option<PathBuf>,
}

impl GitAuthor {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    fn config_value(&self, key: &str) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.args(["config", "--get", key]);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                debug!(error = %err, "git not available for author lookup");
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }

        non_blank(&String::from_utf8_lossy(&output.stdout))
    }
}

impl AuthorSource for GitAuthor {
    fn author(&self) -> Option<String> {
        let name = self.config_value("user.name")?;
        match self.config_value("user.email") {
            Some(email) => Some(format!("{} <{}>", name, email)),
            None => Some(name),
        }
    }
}

/// Reads an environment variable, `$USER` by default
#[derive(Debug, Clone)]
pub struct EnvAuthor {
    pub var: String,
}

impl Default for EnvAuthor {
    fn default() -> Self {
        Self {
            var: "USER".to_string(),
        }
    }
}

impl AuthorSource for EnvAuthor {
    fn author(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(|v| non_blank(&v))
    }
}

/// Returns the first author any source knows, or [`UNKNOWN_AUTHOR`]
pub fn resolve_author(sources: &[&dyn AuthorSource]) -> String {
    for source in sources {
        if let Some(author) = source.author() {
            return author;
        }
    }

    warn!("no author source available, using '{}'", UNKNOWN_AUTHOR);
    UNKNOWN_AUTHOR.to_string()
}

/// Standard chain: configured override, then git, then `$USER`
pub fn default_author(configured: Option<&str>, dir: Option<PathBuf>) -> String {
    let fixed = configured.map(|a| FixedAuthor(a.to_string()));
    let git = GitAuthor { dir };
    let env = EnvAuthor::default();

    let mut sources: Vec<&dyn AuthorSource> = Vec::with_capacity(3);
    if let Some(fixed) = &fixed {
        sources.push(fixed);
    }
    sources.push(&git);
    sources.push(&env);

    resolve_author(&sources)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nobody;

    impl AuthorSource for Nobody {
        fn author(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn first_source_with_an_answer_wins() {
        let first = FixedAuthor("Ada".to_string());
        let second = FixedAuthor("Grace".to_string());

        assert_eq!(resolve_author(&[&Nobody, &first, &second]), "Ada");
    }

    #[test]
    fn falls_back_to_placeholder() {
        assert_eq!(resolve_author(&[&Nobody]), UNKNOWN_AUTHOR);
        assert_eq!(resolve_author(&[]), UNKNOWN_AUTHOR);
    }

    #[test]
    fn blank_fixed_author_is_skipped() {
        let blank = FixedAuthor("   ".to_string());
        let real = FixedAuthor(" Lin ".to_string());

        assert_eq!(resolve_author(&[&blank, &real]), "Lin");
    }

    #[test]
    fn missing_env_var_yields_nothing() {
        let source = EnvAuthor {
            var: "TSK_TEST_AUTHOR_THAT_IS_NEVER_SET".to_string(),
        };
        assert_eq!(source.author(), None);
    }

    #[test]
    fn configured_author_overrides_everything() {
        assert_eq!(default_author(Some("Config Person"), None), "Config Person");
    }

    #[test]
    fn git_outside_a_repository_never_panics() {
        let dir = tempfile::TempDir::new().unwrap();
        // Result depends on the machine's global git config; only the call is checked
        let _ = GitAuthor::in_dir(dir.path()).author();
    }
}
